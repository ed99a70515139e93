//! Handlers for rendering token verification failures as responses

use axum::response::Response;
use http::StatusCode;
use kafejo::error::{ClaimsRejected, JwkVerifyError, JwtVerifyError};

use crate::{
    extract::InvalidAuthorization,
    response::{error_response, unauthorized},
};

/// Handler for responding to failures while verifying a bearer token
pub trait OnTokenError {
    /// Response when the `Authorization` header is missing or does not
    /// carry a bearer token
    fn on_auth_header_error(&self, error: &InvalidAuthorization) -> Response;

    /// Response when the token header does not name a signing key
    fn on_missing_key_id(&self) -> Response;

    /// Response when the token names a signing key that is not present
    /// in the authority's key set
    fn on_no_matching_key(&self) -> Response;

    /// Response when the token was rejected by the authority as invalid
    fn on_token_invalid(&self, error: JwtVerifyError) -> Response;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnTokenError for $ty
            where
                T: OnTokenError,
            {
                fn on_auth_header_error(&self, error: &InvalidAuthorization) -> Response {
                    T::on_auth_header_error(self, error)
                }

                fn on_missing_key_id(&self) -> Response {
                    T::on_missing_key_id(self)
                }

                fn on_no_matching_key(&self) -> Response {
                    T::on_no_matching_key(self)
                }

                fn on_token_invalid(&self, error: JwtVerifyError) -> Response {
                    T::on_token_invalid(self, error)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::rc::Rc<T>
    std::sync::Arc<T>
);

/// The default error handler, rendering failures in the JSON envelope
///
/// Every response carries `{"success": false, "error": <status>,
/// "message": "…"}`. Responses with a `401 Unauthorized` status also
/// carry a `www-authenticate: Bearer` challenge describing the failure.
///
/// The finer-grained cause of each failure is logged at debug level
/// along with a short classification code, but is never serialized
/// into the response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeErrorHandler;

impl EnvelopeErrorHandler {
    /// Constructs a new envelope error handler
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OnTokenError for EnvelopeErrorHandler {
    fn on_auth_header_error(&self, error: &InvalidAuthorization) -> Response {
        let code = if matches!(error, InvalidAuthorization::MissingHeader) {
            "authorization_header_missing"
        } else {
            "invalid_header"
        };
        tracing::debug!(code, "bearer token extraction failed: {error}");

        let message = match error {
            InvalidAuthorization::MissingHeader => "Authorization header is expected",
            InvalidAuthorization::NotBearer => "Authorization header must start with Bearer",
            InvalidAuthorization::MissingToken => "Token not found",
            InvalidAuthorization::NotVisibleAscii | InvalidAuthorization::TooManyParts => {
                "Authorization header must be bearer token"
            }
        };

        unauthorized(message)
    }

    fn on_missing_key_id(&self) -> Response {
        tracing::debug!(
            code = "invalid_header",
            "token header does not name a signing key"
        );
        unauthorized("Authorization malformed")
    }

    fn on_no_matching_key(&self) -> Response {
        tracing::debug!(
            code = "invalid_header",
            "no key in the key set can verify this token"
        );
        error_response(
            StatusCode::BAD_REQUEST,
            "Unable to find the appropriate key",
        )
    }

    fn on_token_invalid(&self, error: JwtVerifyError) -> Response {
        match &error {
            JwtVerifyError::MalformedToken(_)
            | JwtVerifyError::MalformedTokenHeader(_)
            | JwtVerifyError::MalformedTokenPayload(_)
            | JwtVerifyError::MalformedTokenSignature(_) => {
                debug_rejection("invalid_header", &error);
                unauthorized("Authorization malformed")
            }
            JwtVerifyError::ClaimsRejected(ClaimsRejected::TokenExpired) => {
                debug_rejection("token_expired", &error);
                unauthorized("Token expired")
            }
            JwtVerifyError::ClaimsRejected(_) => {
                debug_rejection("invalid_claims", &error);
                unauthorized("Incorrect claims. Please, check the audience and issuer")
            }
            JwtVerifyError::JwkVerifyError(JwkVerifyError::Unexpected(_))
            | JwtVerifyError::Unexpected(_) => {
                debug_rejection("invalid_header", &error);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to parse authentication token",
                )
            }
            JwtVerifyError::JwkVerifyError(_) => {
                debug_rejection("invalid_claims", &error);
                unauthorized("Incorrect claims. Please, check the audience and issuer")
            }
        }
    }
}

fn debug_rejection(code: &str, error: &JwtVerifyError) {
    use std::fmt::Write;

    let mut description = String::new();
    let mut err: &dyn std::error::Error = error;
    write!(&mut description, "{err}").expect("writing to string");
    while let Some(next) = err.source() {
        write!(&mut description, ": {next}").expect("writing to string");
        err = next;
    }
    tracing::debug!(code, "token verification failed: {description}");
}

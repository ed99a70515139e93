use std::{fmt, marker::PhantomData};

use axum::{body::Body, response::Response};
use http::Request;
use kafejo::{jwt::CoreClaims, Jwt};
use kafejo_oauth2::{
    permission::BasicClaimsWithPermissions, Authority, AuthorityError, HasPermissions,
    PermissionPolicy,
};
use tower_http::validate_request::{ValidateRequest, ValidateRequestHeaderLayer};

use crate::{extract::extract_bearer_token, on_error::OnTokenError, EnvelopeErrorHandler};

pub(crate) struct VerifyJwt<Claims, OnError> {
    authority: Authority,
    on_error: OnError,
    _claim: PhantomData<fn() -> Claims>,
}

impl<Claims, OnError> Clone for VerifyJwt<Claims, OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            on_error: self.on_error.clone(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> fmt::Debug for VerifyJwt<Claims, OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyJwt")
            .field("authority", &self.authority)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<Claims, OnError> VerifyJwt<Claims, OnError> {
    #[inline]
    pub(crate) fn new(authority: Authority, on_error: OnError) -> Self {
        Self {
            authority,
            on_error,
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> VerifyJwt<Claims, OnError>
where
    OnError: OnTokenError,
{
    fn handle_verify_error(&self, error: AuthorityError) -> Response {
        match error {
            AuthorityError::MissingKeyId => self.on_error.on_missing_key_id(),
            AuthorityError::UnknownKeyId => self.on_error.on_no_matching_key(),
            AuthorityError::JwtVerifyError(err) => self.on_error.on_token_invalid(err),
            AuthorityError::PolicyDenial(_) => {
                unreachable!("called only when policy is set to allow all")
            }
        }
    }
}

impl<Claims, OnError, ReqBody> ValidateRequest<ReqBody> for VerifyJwt<Claims, OnError>
where
    OnError: OnTokenError,
    Claims: for<'de> serde::Deserialize<'de>
        + HasPermissions
        + CoreClaims
        + Clone
        + Send
        + Sync
        + 'static,
{
    type ResponseBody = Body;

    fn validate(
        &mut self,
        request: &mut Request<ReqBody>,
    ) -> Result<(), Response<Self::ResponseBody>> {
        let jwt = if let Some(jwt) = request.extensions().get::<Jwt>() {
            tracing::trace!("found cached jwt");
            jwt
        } else {
            tracing::trace!("extracting jwt from headers");
            let jwt = extract_bearer_token(request.headers())
                .map_err(|err| self.on_error.on_auth_header_error(&err))?
                .to_owned();

            let _ = request.extensions_mut().insert(jwt);
            request
                .extensions()
                .get::<Jwt>()
                .expect("jwt was just inserted")
        };

        let claims = self
            .authority
            .verify_token::<Claims>(jwt, &PermissionPolicy::allow_any())
            .map_err(|err| self.handle_verify_error(err))?;

        let _ = request.extensions_mut().insert(claims);

        tracing::trace!("jwt was valid");

        Ok(())
    }
}

/// Builder for generating layers that authenticate bearer tokens and
/// make their decoded claims available to request handlers
pub struct TokenAuthorizer<Claims, OnError> {
    on_error: OnError,
    _claim: PhantomData<fn() -> Claims>,
}

impl<Claims, OnError> Clone for TokenAuthorizer<Claims, OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            on_error: self.on_error.clone(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> Copy for TokenAuthorizer<Claims, OnError> where OnError: Copy {}

impl<Claims, OnError> fmt::Debug for TokenAuthorizer<Claims, OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenAuthorizer")
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl TokenAuthorizer<BasicClaimsWithPermissions, ()> {
    /// Constructs a new authorizer expecting the default claims object
    #[inline]
    pub fn new() -> TokenAuthorizer<BasicClaimsWithPermissions, ()> {
        Self {
            on_error: (),
            _claim: PhantomData,
        }
    }
}

impl<OnError> TokenAuthorizer<BasicClaimsWithPermissions, OnError> {
    /// Verification will deserialize the given custom claims object
    /// from the token payload
    #[inline]
    pub fn with_claims<Claims: HasPermissions>(self) -> TokenAuthorizer<Claims, OnError> {
        TokenAuthorizer {
            on_error: self.on_error,
            _claim: PhantomData,
        }
    }
}

impl<Claims> TokenAuthorizer<Claims, ()> {
    /// Attaches a custom error handler to generate responses
    /// in the event of a verification failure
    #[inline]
    pub fn with_error_handler<OnError>(
        self,
        on_error: OnError,
    ) -> TokenAuthorizer<Claims, OnError> {
        TokenAuthorizer {
            on_error,
            _claim: self._claim,
        }
    }

    /// Attaches the default error handler: [`EnvelopeErrorHandler`]
    ///
    /// This error handler generates responses carrying the relevant
    /// status code and a JSON envelope body describing the failure
    #[inline]
    pub fn with_envelope_error_handler(self) -> TokenAuthorizer<Claims, EnvelopeErrorHandler> {
        TokenAuthorizer {
            on_error: EnvelopeErrorHandler::new(),
            _claim: self._claim,
        }
    }
}

impl<Claims, OnError> TokenAuthorizer<Claims, OnError>
where
    OnError: OnTokenError + Clone,
    Claims: for<'de> serde::Deserialize<'de>
        + HasPermissions
        + CoreClaims
        + Clone
        + Send
        + Sync
        + 'static,
{
    /// Authorizer layer that verifies the validity of a bearer token
    ///
    /// The token will be parsed from the request `Authorization` header
    /// and checked for validity by an [`Authority`].
    ///
    /// The extracted `Claims` in the token payload will be made available
    /// through [`Request::extensions`][http::Request::extensions].
    pub fn jwt_layer<ReqBody>(
        &self,
        authority: Authority,
    ) -> ValidateRequestHeaderLayer<impl ValidateRequest<ReqBody, ResponseBody = Body> + Clone>
    {
        ValidateRequestHeaderLayer::custom(VerifyJwt::<Claims, _>::new(
            authority,
            self.on_error.clone(),
        ))
    }
}

impl Default for TokenAuthorizer<BasicClaimsWithPermissions, ()> {
    fn default() -> Self {
        Self::new()
    }
}

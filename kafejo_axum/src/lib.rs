//! Axum utilities that make it easier to verify bearer tokens and enforce
//! the permissions they grant in your application.
//!
//! Authentication and authorization are split across two cooperating
//! pieces: a [`TokenAuthorizer`] layer that verifies the bearer token
//! against an [`Authority`][kafejo_oauth2::Authority] and stashes the
//! decoded claims in the request extensions, and per-endpoint guards
//! declared with [`permission_guards!`] that hand those claims to the
//! handler once the required permission has been checked.
//!
//! # Full Example
//!
//! ```no_run
//! use kafejo::{clock::UnixTime, jwt};
//! use kafejo_axum::TokenAuthorizer;
//! use kafejo_oauth2::{Authority, HasPermissions, PermissionSet};
//! use axum::{
//!     extract::Path,
//!     routing::{get, post},
//!     Router,
//! };
//! use std::net::SocketAddr;
//! use serde::Deserialize;
//!
//! #[derive(Clone, Debug, Deserialize)]
//! pub struct CustomClaims {
//!     iss: jwt::Issuer,
//!     aud: jwt::Audiences,
//!     sub: jwt::Subject,
//!     permissions: Option<PermissionSet>,
//! }
//!
//! impl jwt::CoreClaims for CustomClaims {
//!     fn nbf(&self) -> Option<UnixTime> { None }
//!     fn exp(&self) -> Option<UnixTime> { None }
//!     fn aud(&self) -> &jwt::Audiences { &self.aud }
//!     fn iss(&self) -> Option<&jwt::IssuerRef> { Some(&self.iss) }
//!     fn sub(&self) -> Option<&jwt::SubjectRef> { Some(&self.sub) }
//! }
//!
//! impl HasPermissions for CustomClaims {
//!     fn permissions(&self) -> Option<&PermissionSet> {
//!         self.permissions.as_ref()
//!     }
//! }
//!
//! mod guards {
//!     kafejo_axum::permission_guards! {
//!         type Claims = super::CustomClaims;
//!
//!         pub permission MenuDetails = "get:drinks-detail";
//!         pub permission CreateDrink = "post:drinks";
//!         pub permission RemoveDrink = ["delete:drinks" || "admin"];
//!     }
//! }
//!
//! async fn menu_details(guard: guards::MenuDetails) -> String {
//!     format!("The full menu, for {}", guard.claims().sub)
//! }
//!
//! async fn create_drink(_: guards::CreateDrink) -> &'static str {
//!     "created"
//! }
//!
//! async fn remove_drink(
//!     guards::RemoveDrink(claims): guards::RemoveDrink,
//!     Path(id): Path<u32>,
//! ) -> String {
//!     format!("{} deleted drink {id}", claims.sub)
//! }
//!
//! async fn construct_authority() -> Result<Authority, Box<dyn std::error::Error>> {
//!     // This authority would usually be built from a remote JWKS endpoint
//! #   todo!()
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = construct_authority().await?;
//!     let authorizer = TokenAuthorizer::new()
//!         .with_claims::<CustomClaims>()
//!         .with_envelope_error_handler();
//!
//!     // Build the router
//!     let router = Router::new()
//!         .route("/drinks-detail", get(menu_details))
//!         .route("/drinks", post(create_drink))
//!         .route("/drinks/:id", axum::routing::delete(remove_drink))
//!         .layer(authorizer.jwt_layer(authority));
//!
//!     // Construct the server
//!     let listener = tokio::net::TcpListener::bind(&SocketAddr::new([0, 0, 0, 0].into(), 3000))
//!         .await?;
//!     axum::serve(listener, router).await?;
//!
//!     Ok(())
//! }
//! ```

use std::{error::Error, fmt};

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use kafejo_oauth2::{HasPermissions, PermissionPolicy};

use crate::response::{error_response, forbidden};

mod authorizer;
mod extract;
mod macros;
mod on_error;
pub mod response;

pub use authorizer::TokenAuthorizer;
pub use extract::{extract_bearer_token, InvalidAuthorization};
pub use on_error::{EnvelopeErrorHandler, OnTokenError};

/// Defines a permission policy for a given endpoint guard
pub trait EndpointPermissionPolicy {
    /// The claims structure to extract from the request extensions and return if authorized
    type Claims: HasPermissions;

    /// The policy to be enforced when this type is used as an endpoint guard
    fn policy() -> &'static PermissionPolicy;
}

/// An error indicating that the request could not be authorized
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthFailed {
    /// The server is missing the token claims expected to verify the request
    ///
    /// This generally means the token verification layer was not installed
    /// on the route.
    MissingClaims,

    /// The token claims carry no permissions claim at all
    ///
    /// Distinct from an empty permissions claim, which is reported as
    /// insufficient permissions instead.
    MissingPermissionsClaim,

    /// The permissions included in the token did not satisfy the policy
    ///
    /// If a policy is specified, then the error response will advertise
    /// the allowable permission alternatives in its `www-authenticate`
    /// challenges.
    InsufficientPermissions {
        /// The policy that denied the request
        policy: Option<&'static PermissionPolicy>,
    },
}

impl fmt::Display for AuthFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write;
        match self {
            AuthFailed::MissingClaims => f.write_str("token claims missing"),
            AuthFailed::MissingPermissionsClaim => {
                f.write_str("permissions not included in token claims")
            }
            AuthFailed::InsufficientPermissions { policy: None } => {
                f.write_str("insufficient permissions")
            }
            AuthFailed::InsufficientPermissions {
                policy: Some(policy),
            } => {
                f.write_str(
                    "insufficient permissions; one of the following permission sets is required: [",
                )?;
                let mut alternatives = policy.into_iter();
                let mut maybe_permissions = alternatives.next();
                while let Some(permissions) = maybe_permissions {
                    let next = alternatives.next();

                    write!(f, "{}{}", permissions, if next.is_some() { ", " } else { "" })?;
                    maybe_permissions = next;
                }
                f.write_char(']')
            }
        }
    }
}

impl Error for AuthFailed {}

impl IntoResponse for AuthFailed {
    fn into_response(self) -> Response {
        match &self {
            AuthFailed::MissingClaims => {
                tracing::error!(
                    "token claims missing from request extensions; is the token layer installed?"
                );
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "token claims missing")
            }
            AuthFailed::MissingPermissionsClaim => {
                tracing::debug!(code = "invalid_claims", "token claims carry no permissions");
                error_response(StatusCode::BAD_REQUEST, "Permissions not included in JWT")
            }
            AuthFailed::InsufficientPermissions { policy } => {
                tracing::debug!(code = "unauthorized", "{self}");
                forbidden("Permission not found", *policy)
            }
        }
    }
}

#[doc(hidden)]
pub mod __private {
    use http::request::Parts;
    use kafejo_oauth2::{HasPermissions, Policy};
    pub use kafejo_oauth2::PermissionPolicy;
    pub use once_cell::sync::OnceCell;

    use crate::AuthFailed;

    pub fn from_request<Claims>(
        req: &mut Parts,
        policy: &'static PermissionPolicy,
    ) -> Result<Claims, AuthFailed>
    where
        Claims: HasPermissions + Send + Sync + 'static,
    {
        let claims = req
            .extensions
            .remove::<Claims>()
            .ok_or(AuthFailed::MissingClaims)?;

        let held = claims
            .permissions()
            .ok_or(AuthFailed::MissingPermissionsClaim)?;

        policy
            .evaluate(held)
            .map_err(|_| AuthFailed::InsufficientPermissions {
                policy: Some(policy),
            })?;

        Ok(claims)
    }
}

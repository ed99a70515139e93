//! Access token claims expected by the menu service

use kafejo::clock::UnixTime;
use kafejo::jwt::{self, CoreClaims};
use kafejo_oauth2::{HasPermissions, PermissionSet};
use serde::{Deserialize, Serialize};

/// The claims minted by the authorization server for this API
///
/// Alongside the registered claims, tokens carry the RBAC `permissions`
/// claim that the endpoint guards evaluate, plus a few informational
/// claims the authorization server always includes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiClaims {
    /// The registered claims
    #[serde(flatten)]
    pub basic: jwt::BasicClaims,

    /// When the token was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<UnixTime>,

    /// The party the token was issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Raw OAuth2 scope grants, carried separately from permissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// The `permissions` claim evaluated by the endpoint guards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
}

impl jwt::CoreClaims for ApiClaims {
    #[inline]
    fn nbf(&self) -> Option<UnixTime> {
        self.basic.nbf()
    }

    #[inline]
    fn exp(&self) -> Option<UnixTime> {
        self.basic.exp()
    }

    #[inline]
    fn aud(&self) -> &jwt::Audiences {
        self.basic.aud()
    }

    #[inline]
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.basic.iss()
    }

    #[inline]
    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.basic.sub()
    }
}

impl HasPermissions for ApiClaims {
    #[inline]
    fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }
}

/// Permission guards for the menu endpoints
pub mod guards {
    kafejo_axum::permission_guards! {
        type Claims = super::ApiClaims;

        pub permission DrinksDetail = "get:drinks-detail";
        pub permission PostDrinks = "post:drinks";
        pub permission PatchDrinks = "patch:drinks";
        pub permission DeleteDrinks = "delete:drinks";
    }
}

//! Types used to assert that a presented token is authorized to access protected endpoints

/// Constructs an extractor that enables easily asserting that a provided token
/// has the expected permissions.
///
/// For a more concise way to construct several permission guards, see
/// [`permission_guards!`][crate::permission_guards!].
///
/// In the simplest case, a single permission can be used:
///
/// ```
/// use kafejo_axum::permission_guard;
///
/// permission_guard!(ReadMenu; "get:drinks-detail");
/// ```
///
/// In more complex scenarios, multiple sets of permissions can be accepted by
/// separating sets with the logical or operator (`||`):
///
/// ```
/// use kafejo_axum::permission_guard;
///
/// permission_guard!(
///     ReadMenuOrAdmin;
///     ["get:drinks-detail" || "admin"]
/// );
/// ```
///
/// In situations where multiple permissions must all be present, they should
/// be combined into a single space-separated set:
///
/// ```
/// use kafejo_axum::permission_guard;
///
/// permission_guard!(
///     DeleteDrinksAndAdmin;
///     "delete:drinks admin"
/// );
/// ```
///
/// These two different forms can be combined to express more complex guards:
///
/// ```
/// use kafejo_axum::permission_guard;
///
/// permission_guard!(
///     DeleteDrinksAndAdminOrSuperAdmin;
///     [ "delete:drinks admin" || "super_admin" ]
/// );
/// ```
///
/// These guards can then be used on an axum handler endpoint in order to
/// assert that the presented bearer token is valid according to the
/// configured authority _and_ that it grants the necessary permissions.
///
/// The handlers will expect that the relevant claims have already been
/// validated and placed into the request's extensions, which is the job of
/// [`TokenAuthorizer::jwt_layer`][crate::TokenAuthorizer::jwt_layer].
///
/// A custom claim type can be used in order to better use the validated data:
///
/// ```
/// use kafejo::jwt;
/// use kafejo_axum::permission_guard;
/// use kafejo::clock::UnixTime;
/// use kafejo_oauth2::{HasPermissions, PermissionSet};
/// use serde::Deserialize;
///
/// #[derive(Clone, Debug, Deserialize)]
/// pub struct CustomClaims {
///     iss: jwt::Issuer,
///     aud: jwt::Audiences,
///     sub: jwt::Subject,
///     permissions: Option<PermissionSet>,
/// }
///
/// impl jwt::CoreClaims for CustomClaims {
///     fn nbf(&self) -> Option<UnixTime> { None }
///     fn exp(&self) -> Option<UnixTime> { None }
///     fn aud(&self) -> &jwt::Audiences { &self.aud }
///     fn iss(&self) -> Option<&jwt::IssuerRef> { Some(&self.iss) }
///     fn sub(&self) -> Option<&jwt::SubjectRef> { Some(&self.sub) }
/// }
///
/// impl HasPermissions for CustomClaims {
///     fn permissions(&self) -> Option<&PermissionSet> {
///         self.permissions.as_ref()
///     }
/// }
///
/// // Define our initial guard
/// permission_guard!(AdminOnly(CustomClaims); "admin");
///
/// // Define an endpoint that will require this permission
/// async fn test_endpoint(AdminOnly(token): AdminOnly) -> String {
///     format!("Token subject: {}", token.sub)
/// }
///
/// // Or ignore the token if it isn't required
/// async fn test_endpoint_but_ignore_token_payload(_: AdminOnly) -> &'static str {
///     "You're an admin!"
/// }
/// ```
// This would probably work nicer as a procedural macro, as then it could
// produce even better documentation.
#[macro_export]
macro_rules! permission_guard {
    ($vis:vis $i:ident; *) => {
        $crate::permission_guard!($vis $i(::kafejo_oauth2::permission::BasicClaimsWithPermissions); *);
    };
    ($vis:vis $i:ident; $permission:literal) => {
        $crate::permission_guard!($vis $i; [$permission]);
    };
    ($vis:vis $i:ident; [$($permission:literal)||* $(,)?]) => {
        $crate::permission_guard!($vis $i(::kafejo_oauth2::permission::BasicClaimsWithPermissions); [$($permission)||*]);
    };
    ($vis:vis $i:ident($claim:ty); $permission:literal) => {
        $crate::permission_guard!($vis $i($claim); [$permission]);
    };
    ($vis:vis $i:ident($claim:ty); *) => {
        /// A guard that admits any bearer of a valid token, extracting and
        /// returning the claims
        ///
        /// The token must still carry a permissions claim, even an empty one.
        ///
        /// Note: This extractor will _consume_ the claims from request extensions. Place
        /// any extractors that may need to copy data from the claims before this extractor
        /// in handler definitions.
        $vis struct $i($vis $claim);

        impl $i {
            #[allow(dead_code)]
            $vis fn into_claims(self) -> $claim {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$claim {
                &self.0
            }
        }

        impl $crate::EndpointPermissionPolicy for $i {
            type Claims = $claim;

            fn policy() -> &'static $crate::__private::PermissionPolicy {
                static POLICY: $crate::__private::OnceCell<$crate::__private::PermissionPolicy> = $crate::__private::OnceCell::new();
                POLICY.get_or_init(|| {
                    $crate::__private::PermissionPolicy::allow_any()
                })
            }
        }

        #[::axum::async_trait]
        impl<S> ::axum::extract::FromRequestParts<S> for $i
        where
            S: Sync,
        {
            type Rejection = $crate::AuthFailed;

            async fn from_request_parts(
                req: &mut ::axum::http::request::Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                $crate::__private::from_request(req, <Self as $crate::EndpointPermissionPolicy>::policy()).map(Self)
            }
        }
    };
    ($vis:vis $i:ident($claim:ty); [$($permission:literal)||* $(,)?]) => {
        /// Ensures that a claims object authorizes access to a guarded endpoint
        ///
        /// Note: This extractor will _consume_ the claims from request extensions. Place
        /// any extractors that may need to copy data from the claims before this extractor
        /// in handler definitions.
        ///
        /// The claims object must have one of the following sets of permissions to be
        /// considered authorized. Within each set, all permissions must be present, but
        /// only one set must be satisfied.
        ///
        /// On an authorization failure, the rejection renders the JSON envelope
        /// response and advertises the acceptable permission sets through
        /// `www-authenticate` challenges.
        ///
        /// Accepted permissions:
        $(
            #[doc = concat!("* `", $permission, "`")]
        )*
        $vis struct $i($vis $claim);

        impl $i {
            #[allow(dead_code)]
            $vis fn into_claims(self) -> $claim {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$claim {
                &self.0
            }
        }

        impl $crate::EndpointPermissionPolicy for $i {
            type Claims = $claim;

            fn policy() -> &'static $crate::__private::PermissionPolicy {
                static POLICY: $crate::__private::OnceCell<$crate::__private::PermissionPolicy> = $crate::__private::OnceCell::new();
                POLICY.get_or_init(|| {
                    $crate::__private::PermissionPolicy::deny_all()
                    $(
                        .or_allow($permission.parse().unwrap())
                    )*
                })
            }
        }

        #[::axum::async_trait]
        impl<S> ::axum::extract::FromRequestParts<S> for $i
        where
            S: Sync,
        {
            type Rejection = $crate::AuthFailed;

            async fn from_request_parts(
                req: &mut ::axum::http::request::Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                $crate::__private::from_request(req, <Self as $crate::EndpointPermissionPolicy>::policy()).map(Self)
            }
        }
    };
}

/// Convenience macro for services that need to define many permission guards.
///
/// # Example
///
/// ```
/// use kafejo_axum::permission_guards;
///
/// permission_guards! {
///     permission MenuDetails = "get:drinks-detail";
///     permission CreateDrink = "post:drinks";
///     permission ModifyDrink = "patch:drinks";
///     permission RemoveDrink = "delete:drinks";
///     permission RemoveOrAdmin = ["delete:drinks" || "admin"];
///     permission AnyBearer = *;
///     permission NoOne = [];
/// }
/// ```
///
/// The above will define a permission guard type for each of the named
/// permissions, similar to the [`permission_guard!`] macro.
///
/// Using a custom claims type can be done with a `type Claims = <...>` declaration.
///
/// ```
/// use kafejo_axum::permission_guards;
/// use kafejo_oauth2::{HasPermissions, PermissionSet};
///
/// struct CustomClaims {
///     permissions: Option<PermissionSet>,
/// }
///
/// impl HasPermissions for CustomClaims {
///     fn permissions(&self) -> Option<&PermissionSet> {
///        self.permissions.as_ref()
///     }
/// }
///
/// permission_guards! {
///     type Claims = CustomClaims;
///
///     permission MenuDetails = "get:drinks-detail";
///     permission CreateDrink = "post:drinks";
///     permission ModifyDrink = "patch:drinks";
///     permission RemoveDrink = "delete:drinks";
/// }
/// ```
#[macro_export]
macro_rules! permission_guards {
    ($($vis:vis permission $i:ident = $permission:tt);* $(;)?) => {
        $(
            $crate::permission_guard!($vis $i; $permission);
        )*
    };
    (type Claims = $claims:ty; $($vis:vis permission $i:ident = $permission:tt);* $(;)?) => {
        $(
            $crate::permission_guard!($vis $i($claims); $permission);
        )*
    };
}

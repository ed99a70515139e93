use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use kafejo::{
    jwt::{self, CoreHeaders, HasAlgorithm},
    Jwks, JwtRef,
};
#[cfg(feature = "reqwest")]
use reqwest::{
    header::{self, HeaderValue},
    Client, StatusCode,
};
use serde::Deserialize;
use thiserror::Error;

use crate::{HasPermissions, PermissionPolicy, PermissionSet, Policy};

/// Indicates that a token could not be authenticated or was not granted
/// access to a controlled resource
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Indicates that the authority cannot verify the JWT because the token
    /// header does not identify the key used to sign it
    #[error("no key ID specified in token header")]
    MissingKeyId,
    /// Indicates that the authority cannot verify the JWT because it cannot
    /// find a key which matches the specifications in the token header
    #[error("no matching key found to validate JWT")]
    UnknownKeyId,
    /// Indicates that the JWT was malformed or otherwise defective
    #[error("invalid JWT")]
    JwtVerifyError(#[from] kafejo::error::JwtVerifyError),
    /// Indicates that, while the JWT was acceptable, it does not grant the
    /// level of authorization requested.
    #[error("access denied by policy")]
    PolicyDenial(#[from] crate::InsufficientPermissions),
}

#[derive(Debug)]
struct VolatileData {
    jwks: Jwks,
    #[cfg(feature = "reqwest")]
    etag: Option<HeaderValue>,
    #[cfg(feature = "reqwest")]
    last_modified: Option<HeaderValue>,
}

impl VolatileData {
    fn new(jwks: Jwks) -> Self {
        Self {
            jwks,
            #[cfg(feature = "reqwest")]
            etag: None,
            #[cfg(feature = "reqwest")]
            last_modified: None,
        }
    }
}

#[derive(Debug)]
#[cfg(feature = "reqwest")]
struct RemoteOptions {
    jwks_url: String,
    client: Client,
}

#[derive(Debug)]
struct Inner {
    data: ArcSwap<VolatileData>,
    #[cfg(feature = "reqwest")]
    remote: Option<RemoteOptions>,
    validator: jwt::CoreValidator,
}

/// An authority backed by a potentially dynamic JSON Web Key Set (JWKS)
/// held by a remote source
#[derive(Debug, Clone)]
#[must_use]
pub struct Authority {
    inner: Arc<Inner>,
}

impl Authority {
    /// Constructs a new JWKS authority from an existing JWKS
    pub fn new(jwks: Jwks, validator: jwt::CoreValidator) -> Self {
        let data = VolatileData::new(jwks);

        Self {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(data),
                #[cfg(feature = "reqwest")]
                remote: None,
                validator,
            }),
        }
    }

    /// Constructs a new JWKS authority from a URL
    #[cfg(feature = "reqwest")]
    #[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
    pub async fn new_from_url(
        jwks_url: String,
        validator: jwt::CoreValidator,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("kafejo_oauth2/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let response = client.get(&jwks_url).send().await?;
        response.error_for_status_ref()?;

        let etag = response.headers().get(header::ETAG).map(ToOwned::to_owned);
        let last_modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .map(ToOwned::to_owned);
        let jwks = response.json::<Jwks>().await?;

        let data = VolatileData {
            jwks,
            etag,
            last_modified,
        };

        tracing::info!(jwks.url = %jwks_url, "JWKS refreshed");

        Ok(Self {
            inner: Arc::new(Inner {
                data: ArcSwap::from_pointee(data),
                remote: Some(RemoteOptions { jwks_url, client }),
                validator,
            }),
        })
    }

    /// A non-terminating future that will automatically refresh the JWKS
    /// using the configured interval
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn spawn_refresh(&self, interval: Duration) {
        let this = self.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;

            loop {
                timer.tick().await;
                // Ignore any errors; we'll just try again next time
                let _ = this.refresh().await;
            }
        });
    }

    /// Refreshes the JWKS from the remote URL
    ///
    /// No retries are attempted. If the attempt to refresh the JWKS from
    /// the remote URL fails, no change is made to the internal JWKS.
    #[cfg(feature = "reqwest")]
    #[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
    #[tracing::instrument(skip(self), fields(jwks.url = tracing::field::Empty))]
    pub async fn refresh(&self) -> Result<(), reqwest::Error> {
        if let Some(remote) = &self.inner.remote {
            let span = tracing::Span::current();
            span.record("jwks.url", &remote.jwks_url);
            tracing::debug!("refreshing JWKS");
            let mut request = remote.client.get(&remote.jwks_url);

            {
                let data = self.inner.data.load();
                if let Some(etag) = &data.etag {
                    request = request.header(header::IF_NONE_MATCH, etag)
                } else if let Some(last_modified) = &data.last_modified {
                    request = request.header(header::IF_MODIFIED_SINCE, last_modified)
                }
            }

            let response = request.send().await?;

            if response.status() == StatusCode::NOT_MODIFIED {
                tracing::debug!("JWKS not modified");
                return Ok(());
            } else if let Err(err) = response.error_for_status_ref() {
                let error: &dyn std::error::Error = &err;
                tracing::warn!(
                    error,
                    http.status_code = response.status().as_u16(),
                    "JWKS refresh failed; unexpected response status",
                );
                return Err(err);
            }

            let etag = response.headers().get(header::ETAG).map(ToOwned::to_owned);
            let last_modified = response
                .headers()
                .get(header::LAST_MODIFIED)
                .map(ToOwned::to_owned);
            match response.json::<Jwks>().await {
                Ok(jwks) => {
                    let data = Arc::new(VolatileData {
                        jwks,
                        etag,
                        last_modified,
                    });

                    self.inner.data.store(data);
                    tracing::info!("JWKS refreshed");
                }
                Err(err) => {
                    let error: &dyn std::error::Error = &err;
                    tracing::warn!(error, "JWKS refresh failed; unexpected error");
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Refreshes the JWKS from the remote URL
    ///
    /// No retries are attempted. If the attempt to refresh the JWKS from
    /// the remote URL fails, no change is made to the internal JWKS.
    #[cfg(not(feature = "reqwest"))]
    #[cfg_attr(docsrs, doc(cfg(not(feature = "reqwest"))))]
    #[tracing::instrument]
    pub async fn refresh(&self) -> Result<(), std::convert::Infallible> {
        Ok(())
    }

    /// Updates the JWKS associated with the internal state
    pub fn set_jwks(&self, jwks: Jwks) {
        let data = Arc::new(VolatileData::new(jwks));
        self.inner.data.store(data);
    }

    /// Authenticates the token and checks access according to the policy
    ///
    /// A token that carries no permissions claim at all is treated as
    /// holding an empty set of permissions; a policy with any requirements
    /// will then deny it. Callers that need to distinguish the missing
    /// claim from an empty one can inspect the extracted claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or is not authorized by the policy
    pub fn verify_token<T>(
        &self,
        token: &JwtRef,
        policy: &PermissionPolicy,
    ) -> Result<T, AuthorityError>
    where
        T: for<'de> Deserialize<'de> + HasPermissions + jwt::CoreClaims,
    {
        let decomposed = token.decompose()?;

        let validated: jwt::Validated<T>;
        {
            let guard = self.inner.data.load();

            let key = {
                let kid = decomposed.kid().ok_or_else(|| {
                    tracing::debug!("token header does not identify a signing key");
                    AuthorityError::MissingKeyId
                })?;
                let alg = decomposed.alg();

                guard.jwks.get_key_by_id(kid, alg).ok_or_else(|| {
                    tracing::debug!(%kid, %alg, "unable to find matching key");
                    AuthorityError::UnknownKeyId
                })?
            };

            validated = decomposed.verify(key, &self.inner.validator)?;
        }

        let held = validated
            .claims()
            .permissions()
            .unwrap_or_else(|| PermissionSet::empty_ref());
        policy.evaluate(held)?;

        let (_, validated_claims) = validated.extract();

        Ok(validated_claims)
    }
}

#[cfg(test)]
mod tests {
    use kafejo::{jwa, jwk, jws, Jwk, Jwt};

    use super::*;
    use crate::permission::BasicClaimsWithPermissions;
    use crate::permissions;

    const KEY_ID: &str = "fBcOdRmPw";

    fn test_key() -> (openssl::rsa::Rsa<openssl::pkey::Private>, Jwk) {
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let jwk = Jwk::from(
            jwa::rsa::PublicKey::from_components(rsa.n().to_vec(), rsa.e().to_vec()).unwrap(),
        )
        .with_key_id(jwk::KeyId::from_static(KEY_ID))
        .with_algorithm(jws::Algorithm::RS256);
        (rsa, jwk)
    }

    fn authority_for(jwk: Jwk) -> Authority {
        let mut jwks = Jwks::default();
        jwks.add_key(jwk);

        let validator = jwt::CoreValidator::default()
            .add_approved_algorithm(jws::Algorithm::RS256)
            .add_allowed_audience(jwt::Audience::from_static("k_cafe"))
            .require_issuer(jwt::Issuer::from_static("https://cafe.example.com/"));

        Authority::new(jwks, validator)
    }

    fn claims(permissions: Option<PermissionSet>) -> BasicClaimsWithPermissions {
        BasicClaimsWithPermissions {
            basic: jwt::BasicClaims::new()
                .with_audience(jwt::Audience::from_static("k_cafe"))
                .with_issuer(jwt::Issuer::from_static("https://cafe.example.com/"))
                .with_future_expiration(60 * 5),
            permissions,
        }
    }

    fn mint(
        rsa: &openssl::rsa::Rsa<openssl::pkey::Private>,
        headers: &jwt::BasicHeaders,
        claims: &BasicClaimsWithPermissions,
    ) -> Jwt {
        mint_with_digest(rsa, headers, claims, openssl::hash::MessageDigest::sha256())
    }

    fn mint_with_digest(
        rsa: &openssl::rsa::Rsa<openssl::pkey::Private>,
        headers: &jwt::BasicHeaders,
        claims: &BasicClaimsWithPermissions,
        digest: openssl::hash::MessageDigest,
    ) -> Jwt {
        use kafejo::Base64Url;

        let h_raw = Base64Url::from_raw(serde_json::to_vec(headers).unwrap());
        let p_raw = Base64Url::from_raw(serde_json::to_vec(claims).unwrap());
        let message = format!("{h_raw}.{p_raw}");

        let pkey = openssl::pkey::PKey::from_rsa(rsa.clone()).unwrap();
        let mut signer = openssl::sign::Signer::new(digest, &pkey).unwrap();
        signer.update(message.as_bytes()).unwrap();
        let signature = Base64Url::from_raw(signer.sign_to_vec().unwrap());

        Jwt::new(format!("{message}.{signature}"))
    }

    #[test]
    fn verifies_token_and_extracts_claims() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let token = mint(
            &rsa,
            &headers,
            &claims(Some(permissions!["get:drinks-detail"])),
        );

        let policy = PermissionPolicy::allow_one(permissions!["get:drinks-detail"]);
        let verified: BasicClaimsWithPermissions =
            authority.verify_token(&token, &policy).unwrap();

        assert_eq!(
            verified.permissions.unwrap(),
            permissions!["get:drinks-detail"]
        );
    }

    #[test]
    fn rejects_token_without_key_id() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::new(jws::Algorithm::RS256);
        let token = mint(&rsa, &headers, &claims(None));

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(err, Err(AuthorityError::MissingKeyId)));
    }

    #[test]
    fn rejects_token_with_unknown_key_id() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, "somebody-else");
        let token = mint(&rsa, &headers, &claims(None));

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(err, Err(AuthorityError::UnknownKeyId)));
    }

    #[test]
    fn rejects_expired_token() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let expired = BasicClaimsWithPermissions {
            basic: jwt::BasicClaims::new()
                .with_audience(jwt::Audience::from_static("k_cafe"))
                .with_issuer(jwt::Issuer::from_static("https://cafe.example.com/"))
                .with_expiration(kafejo::clock::UnixTime(1)),
            permissions: None,
        };
        let token = mint(&rsa, &headers, &expired);

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(
            err,
            Err(AuthorityError::JwtVerifyError(
                kafejo::error::JwtVerifyError::ClaimsRejected(
                    kafejo::error::ClaimsRejected::TokenExpired
                )
            ))
        ));
    }

    #[test]
    fn rejects_token_for_another_audience() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let other = BasicClaimsWithPermissions {
            basic: jwt::BasicClaims::new()
                .with_audience(jwt::Audience::from_static("somebody_else"))
                .with_issuer(jwt::Issuer::from_static("https://cafe.example.com/"))
                .with_future_expiration(60 * 5),
            permissions: None,
        };
        let token = mint(&rsa, &headers, &other);

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(
            err,
            Err(AuthorityError::JwtVerifyError(
                kafejo::error::JwtVerifyError::ClaimsRejected(
                    kafejo::error::ClaimsRejected::InvalidAudience
                )
            ))
        ));
    }

    #[test]
    fn rejects_disapproved_algorithm_when_key_declares_none() {
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let jwk = Jwk::from(
            jwa::rsa::PublicKey::from_components(rsa.n().to_vec(), rsa.e().to_vec()).unwrap(),
        )
        .with_key_id(jwk::KeyId::from_static(KEY_ID));
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS384, KEY_ID);
        let token = mint_with_digest(
            &rsa,
            &headers,
            &claims(None),
            openssl::hash::MessageDigest::sha384(),
        );

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(
            err,
            Err(AuthorityError::JwtVerifyError(
                kafejo::error::JwtVerifyError::ClaimsRejected(
                    kafejo::error::ClaimsRejected::InvalidAlgorithm
                )
            ))
        ));
    }

    #[test]
    fn rejects_token_signed_by_another_key() {
        let (_, jwk) = test_key();
        let authority = authority_for(jwk);

        let impostor = openssl::rsa::Rsa::generate(2048).unwrap();
        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let token = mint(&impostor, &headers, &claims(None));

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(
            err,
            Err(AuthorityError::JwtVerifyError(
                kafejo::error::JwtVerifyError::JwkVerifyError(e)
            )) if e.is_signature_mismatch()
        ));
    }

    #[test]
    fn denies_token_lacking_required_permission() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let token = mint(
            &rsa,
            &headers,
            &claims(Some(permissions!["get:drinks-detail"])),
        );

        let policy = PermissionPolicy::allow_one(permissions!["delete:drinks"]);
        let err = authority.verify_token::<BasicClaimsWithPermissions>(&token, &policy);
        assert!(matches!(err, Err(AuthorityError::PolicyDenial(_))));
    }

    #[test]
    fn treats_absent_permissions_claim_as_empty() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let token = mint(&rsa, &headers, &claims(None));

        let restrictive = PermissionPolicy::allow_one(permissions!["get:drinks-detail"]);
        let err = authority.verify_token::<BasicClaimsWithPermissions>(&token, &restrictive);
        assert!(matches!(err, Err(AuthorityError::PolicyDenial(_))));

        let verified: BasicClaimsWithPermissions = authority
            .verify_token(&token, &PermissionPolicy::allow_any())
            .unwrap();
        assert!(verified.permissions.is_none());
    }

    #[test]
    fn set_jwks_replaces_the_key_set() {
        let (rsa, jwk) = test_key();
        let authority = authority_for(jwk);

        let headers = jwt::BasicHeaders::with_key_id(jws::Algorithm::RS256, KEY_ID);
        let token = mint(&rsa, &headers, &claims(None));

        authority.set_jwks(Jwks::default());

        let err = authority
            .verify_token::<BasicClaimsWithPermissions>(&token, &PermissionPolicy::allow_any());
        assert!(matches!(err, Err(AuthorityError::UnknownKeyId)));
    }

    #[tokio::test]
    async fn refresh_without_remote_is_a_no_op() {
        let (_, jwk) = test_key();
        let authority = authority_for(jwk);

        authority.refresh().await.unwrap();
    }
}

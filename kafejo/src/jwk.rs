//! Implementation of the JSON Web Keys (JWK) standard
//!
//! The specification for JWK can be found in [RFC7517][]. Only RSA public
//! keys are supported, and only for signature verification.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

use crate::{error, jwa, jws};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to a JWK key ID ([`KeyId`])")]
pub struct KeyId;

/// An identified JSON Web Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JwkDto", into = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jws::Algorithm>,
    key: Key,
}

impl Jwk {
    /// The key ID (`kid`) declared by this key, if any
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The usage (`use`) declared by this key, if any
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The algorithm (`alg`) declared by this key, if any
    #[must_use]
    pub fn algorithm(&self) -> Option<jws::Algorithm> {
        self.algorithm
    }

    /// Sets the key ID of this key
    pub fn with_key_id(mut self, kid: impl Into<KeyId>) -> Self {
        self.key_id = Some(kid.into());
        self
    }

    /// Sets the algorithm of this key, along with the matching usage
    pub fn with_algorithm(mut self, alg: impl Into<jws::Algorithm>) -> Self {
        let alg = alg.into();
        self.algorithm = Some(alg);
        self.usage = Some(alg.to_usage());
        self
    }

    /// Whether this key may be used to verify signatures produced by the
    /// given algorithm, given the constraints the key declares
    #[must_use]
    pub fn is_compatible(&self, alg: jws::Algorithm) -> bool {
        if let Some(declared) = self.algorithm {
            if declared != alg {
                return false;
            }
        }

        if let Some(usage) = self.usage {
            if usage != alg.to_usage() {
                return false;
            }
        }

        let Key::Rsa(key) = &self.key;
        jws::Verifier::can_verify(key, alg)
    }
}

impl From<jwa::rsa::PublicKey> for Jwk {
    fn from(key: jwa::rsa::PublicKey) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key: Key::Rsa(key),
        }
    }
}

impl jws::Verifier for Jwk {
    type Algorithm = jws::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.is_compatible(alg)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if let Some(declared) = self.algorithm {
            if declared != alg {
                return Err(error::incompatible_algorithm(alg).into());
            }
        }

        if let Some(usage) = self.usage {
            if usage != alg.to_usage() {
                return Err(error::jwk_usage_mismatch().into());
            }
        }

        let Key::Rsa(key) = &self.key;
        key.verify(alg, data, signature)?;
        Ok(())
    }
}

/// The underlying key material, discriminated by key type (`kty`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
enum Key {
    #[serde(rename = "RSA")]
    Rsa(jwa::rsa::PublicKey),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JwkDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<KeyId>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<jws::Algorithm>,

    #[serde(flatten)]
    key: Key,
}

impl From<JwkDto> for Jwk {
    fn from(dto: JwkDto) -> Self {
        Self {
            key_id: dto.kid,
            usage: dto.usage,
            algorithm: dto.alg,
            key: dto.key,
        }
    }
}

impl From<Jwk> for JwkDto {
    fn from(jwk: Jwk) -> Self {
        Self {
            kid: jwk.key_id,
            usage: jwk.usage,
            alg: jwk.algorithm,
            key: jwk.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    #[test]
    fn parses_a_full_jwk() -> Result<()> {
        let jwk: Jwk = serde_json::from_str(test::rsa::JWK)?;
        assert_eq!(jwk.key_id(), Some(KeyIdRef::from_str(test::rsa::TEST_KEY_ID)));
        assert_eq!(jwk.usage(), Some(jwa::Usage::Signing));
        assert_eq!(jwk.algorithm(), Some(jws::Algorithm::RS256));
        Ok(())
    }

    #[test]
    fn parses_a_minimal_jwk() -> Result<()> {
        let jwk: Jwk = serde_json::from_str(test::rsa::JWK_MINIMAL)?;
        assert_eq!(jwk.key_id(), None);
        assert_eq!(jwk.usage(), None);
        assert_eq!(jwk.algorithm(), None);
        assert!(jwk.is_compatible(jws::Algorithm::RS256));
        Ok(())
    }

    #[test]
    fn rejects_unsupported_key_type() {
        let err = serde_json::from_str::<Jwk>(
            r#"{"kty":"EC","crv":"P-256","x":"AAAA","y":"AAAA"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn declared_algorithm_constrains_compatibility() -> Result<()> {
        let jwk: Jwk = serde_json::from_str(test::rsa::JWK)?;
        assert!(jwk.is_compatible(jws::Algorithm::RS256));
        assert!(!jwk.is_compatible(jws::Algorithm::RS384));
        Ok(())
    }

    #[test]
    fn round_trips_through_serde() -> Result<()> {
        let jwk: Jwk = serde_json::from_str(test::rsa::JWK)?;
        let json = serde_json::to_string(&jwk)?;
        let back: Jwk = serde_json::from_str(&json)?;
        assert_eq!(back, jwk);
        Ok(())
    }
}

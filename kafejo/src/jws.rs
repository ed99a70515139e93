//! Implementation of the JSON Web Signatures (JWS) standard
//!
//! The specification for JWS can be found in [RFC7515][]. Only the RSA
//! signing algorithms from [RFC7518][] are supported.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error, jwa};

/// A signature verification algorithm
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[must_use]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,

    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,

    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
}

impl Algorithm {
    /// The name of the algorithm as it appears in a JOSE `alg` parameter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        }
    }

    /// Gets the key usage related to this algorithm
    pub const fn to_usage(self) -> jwa::Usage {
        jwa::Usage::Signing
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    #[inline]
    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            _ => Err(error::unknown_algorithm(value.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// A verifier capable of verifying signatures produced by a signing algorithm
pub trait Verifier {
    /// The algorithm family used by this verifier
    type Algorithm;

    /// The error produced when verification fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether this verifier can verify signatures produced
    /// by the given algorithm
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Verifies the signature over the data using the given algorithm
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is invalid or if this verifier
    /// cannot verify signatures produced by the given algorithm.
    fn verify(&self, alg: Self::Algorithm, data: &[u8], signature: &[u8])
        -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Algorithm::RS256).unwrap(), "\"RS256\"");
        let alg: Algorithm = serde_json::from_str("\"RS384\"").unwrap();
        assert_eq!(alg, Algorithm::RS384);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        assert!("HS256".parse::<Algorithm>().is_err());
        assert!(serde_json::from_str::<Algorithm>("\"none\"").is_err());
    }
}

//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for these algorithms can be found in [RFC7518][].
//! Of the key types defined there, only RSA public keys are supported.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use serde::{Deserialize, Serialize};

pub mod rsa;

/// The intended use for a JWA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Usage {
    /// The JWA is intended for signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// The JWA is intended for encryption
    #[serde(rename = "enc")]
    Encryption,
}

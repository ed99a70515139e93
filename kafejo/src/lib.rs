//! This crate implements the verification half of the Javascript/JSON Object
//! Signing and Encryption (JOSE) standards, including:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Key (JWK): [RFC7517][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][]
//!
//! Only the RSA signing algorithms (`RS256`, `RS384`, `RS512`) are supported,
//! and only for verification. Tokens are minted elsewhere; this crate checks
//! their signatures against a published key set and validates their claims.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```no_run
//! use kafejo::{jws, jwt, Jwks, JwtRef};
//! use kafejo::jwt::{CoreHeaders, HasAlgorithm};
//!
//! # fn example(keys: Jwks) -> Result<(), Box<dyn std::error::Error>> {
//! let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiIsImtpZCI6ImtleS0xIn0.eyJzdWIiOiJtZSJ9.c2ln");
//!
//! let validator = jwt::CoreValidator::default()
//!     .add_approved_algorithm(jws::Algorithm::RS256)
//!     .add_allowed_audience(jwt::Audience::from_static("my_api"))
//!     .require_issuer(jwt::Issuer::from_static("https://issuer.example.com/"));
//!
//! let decomposed: jwt::Decomposed = token.decompose()?;
//! let kid = decomposed.kid().ok_or("no key ID")?;
//! let key = keys.get_key_by_id(kid, decomposed.alg()).ok_or("no matching key")?;
//!
//! let data: jwt::Validated = decomposed.verify(key, &validator)?;
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod b64;
pub mod clock;
pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;


#[doc(inline)]
pub use b64::Base64Url;
#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};

//! Extraction of bearer tokens from request headers

use http::{header, HeaderMap};
use kafejo::JwtRef;
use thiserror::Error;

/// An error encountered while locating a bearer token in the
/// `Authorization` header
///
/// Each variant corresponds to a distinct way the header can fail
/// to carry a bearer token, so that error responses can describe
/// the actual defect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum InvalidAuthorization {
    /// No `Authorization` header was present on the request
    #[error("authorization header missing")]
    MissingHeader,

    /// The header value contained bytes outside visible ASCII
    #[error("authorization header is not visible ASCII")]
    NotVisibleAscii,

    /// The authorization scheme was not `Bearer`
    #[error("authorization scheme is not bearer")]
    NotBearer,

    /// The header contained a scheme but no token
    #[error("authorization header has no token")]
    MissingToken,

    /// The header contained more parts than scheme and token
    #[error("authorization header has too many parts")]
    TooManyParts,
}

/// Locates the bearer token in the `Authorization` header
///
/// The header value is split on whitespace and must contain exactly
/// two parts: the `Bearer` scheme (compared case-insensitively) and
/// the token itself. The scheme is checked before the part count, so
/// a request using a different scheme reports [`NotBearer`][InvalidAuthorization::NotBearer]
/// even when it also has the wrong number of parts.
///
/// No structural validation is performed on the returned token; a
/// value that is not a well-formed JWT will be rejected later, when
/// it is decomposed for verification.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&JwtRef, InvalidAuthorization> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(InvalidAuthorization::MissingHeader)?;

    let value = header
        .to_str()
        .map_err(|_| InvalidAuthorization::NotVisibleAscii)?;

    let mut parts = value.split_whitespace();

    let scheme = parts.next().ok_or(InvalidAuthorization::NotBearer)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(InvalidAuthorization::NotBearer);
    }

    let token = parts.next().ok_or(InvalidAuthorization::MissingToken)?;
    if parts.next().is_some() {
        return Err(InvalidAuthorization::TooManyParts);
    }

    Ok(JwtRef::from_str(token))
}

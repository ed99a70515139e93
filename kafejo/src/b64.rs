//! Owned byte buffers that serialize using URL-safe base64 with no padding
//!
//! The underlying data is stored as an actual byte vector. Costs of conversion
//! between base64 and raw bytes are only paid on calls to [`from_encoded()`][Base64Url::from_encoded]
//! or when converting to a string through debug or display formatting.
//!
//! This is the encoding used by the JOSE family of standards for key material,
//! token segments, and signatures. The underlying encoding and decoding
//! mechanism is provided by the [`base64`](https://docs.rs/base64) crate.
//!
//! # Example
//!
//! ```
//! use kafejo::b64::Base64Url;
//!
//! let data = Base64Url::from_raw("hello, world!".as_bytes());
//! assert_eq!(data.to_string(), "aGVsbG8sIHdvcmxkIQ");
//!
//! let decoded = Base64Url::from_encoded("aGVsbG8sIHdvcmxkIQ").unwrap();
//! assert_eq!(decoded.as_slice(), b"hello, world!");
//! ```

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An error while decoding a value which is not properly formatted
/// URL-safe base64 data
#[derive(Debug, Error)]
#[error("invalid base64url data")]
pub struct InvalidBase64Data {
    #[from]
    source: base64::DecodeError,
}

/// Owned data to be encoded as URL-safe base64 with no padding
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Creates an empty buffer
    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Wraps raw bytes without encoding them
    #[inline]
    pub fn from_raw<T: Into<Vec<u8>>>(raw: T) -> Self {
        Self(raw.into())
    }

    /// Decodes a URL-safe base64 buffer into its raw bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not valid URL-safe base64 data
    /// without padding.
    pub fn from_encoded<T: AsRef<[u8]>>(enc: T) -> Result<Self, InvalidBase64Data> {
        let data = URL_SAFE_NO_PAD.decode(enc.as_ref())?;
        Ok(Self(data))
    }

    /// A view of the underlying raw bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the underlying byte vector
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The length of the underlying raw data
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the underlying buffer is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&'_ [u8]> for Base64Url {
    #[inline]
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Base64Url {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The encoded form of the data, fenced in backticks
impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", URL_SAFE_NO_PAD.encode(&self.0))
    }
}

/// The encoded form of the data
impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl Serialize for Base64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = Base64Url;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("URL-safe base64 data without padding")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Base64Url::from_encoded(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

//! RSA public keys for signature verification

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::{b64::Base64Url, error, jws};

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto")]
pub struct PublicKey {
    /// The public modulus
    #[serde(rename = "n")]
    modulus: Base64Url,

    /// The public exponent
    #[serde(rename = "e")]
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    pub fn modulus(&self) -> &Base64Url {
        &self.modulus
    }

    /// The public key's exponent
    pub fn exponent(&self) -> &Base64Url {
        &self.exponent
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// Returns an error if the modulus is not that of a 2048-bit key.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = modulus.into();
        let exponent = exponent.into();
        if modulus.as_slice().len() != 256 {
            return Err(error::key_rejected("key modulus must be 2048 bits"));
        }

        Ok(Self { modulus, exponent })
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = jws::Algorithm;
    type Error = error::SignatureMismatch;

    fn can_verify(&self, _alg: Self::Algorithm) -> bool {
        true
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(verification_params(alg), data, signature)
            .map_err(|_| error::signature_mismatch())
    }
}

fn verification_params(alg: jws::Algorithm) -> &'static ring::signature::RsaParameters {
    match alg {
        jws::Algorithm::RS256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
        jws::Algorithm::RS384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
        jws::Algorithm::RS512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
    }
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_components(dto.modulus, dto.exponent)
    }
}

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct PublicKeyDto {
    /// The public modulus
    #[serde(rename = "n")]
    modulus: Base64Url,

    /// The public exponent
    #[serde(rename = "e")]
    exponent: Base64Url,
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::jws::Verifier as _;
    use crate::test;

    #[test]
    fn parses_public_key_components() -> Result<()> {
        let key: PublicKey = serde_json::from_str(test::rsa::PUBLIC_COMPONENTS)?;
        assert_eq!(key.modulus().as_slice().len(), 256);
        assert_eq!(key.exponent().as_slice(), &[0x01, 0x00, 0x01]);
        Ok(())
    }

    #[test]
    fn rejects_short_modulus() {
        let err = PublicKey::from_components(&b"too short"[..], &b"\x01\x00\x01"[..]);
        assert!(err.is_err());
    }

    #[test]
    fn verifies_an_openssl_signature() -> Result<()> {
        let rsa = openssl::rsa::Rsa::generate(2048)?;
        let key = PublicKey::from_components(rsa.n().to_vec(), rsa.e().to_vec())?;

        let message = b"sign me, please";
        let pkey = openssl::pkey::PKey::from_rsa(rsa)?;
        let mut signer = openssl::sign::Signer::new(openssl::hash::MessageDigest::sha256(), &pkey)?;
        signer.update(message)?;
        let signature = signer.sign_to_vec()?;

        key.verify(jws::Algorithm::RS256, message, &signature)?;
        assert!(key
            .verify(jws::Algorithm::RS256, b"a different message", &signature)
            .is_err());
        assert!(key
            .verify(jws::Algorithm::RS384, message, &signature)
            .is_err());
        Ok(())
    }
}

//! Implementation of the JSON Web Key Set (JWKS) standard
//!
//! Key sets are usually published at a well-known URL and may contain keys
//! of many types. Keys that cannot be understood are ignored rather than
//! failing the parse of the entire set, as a published set may legitimately
//! carry key types or algorithms beyond those supported here.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{jwk::KeyIdRef, jws, Jwk};

/// A set of JSON Web Keys
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the key set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// All of the keys in the key set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Looks for the best key matching the given key ID, usable with the
    /// given algorithm
    ///
    /// Keys that declare a conflicting key ID, algorithm, or usage are
    /// excluded. Among the remaining candidates, keys declaring more of the
    /// matching parameters are preferred.
    #[must_use]
    pub fn get_key_by_id(&self, kid: &KeyIdRef, alg: jws::Algorithm) -> Option<&Jwk> {
        get_key_by_id_impl(&self.keys, kid, alg)
    }

    /// Looks for the best key usable with the given algorithm, matching the
    /// key ID when one is given
    ///
    /// With no key ID, any key that does not declare a conflicting algorithm
    /// or usage is a candidate.
    #[must_use]
    pub fn get_key_by_opt(&self, kid: Option<&KeyIdRef>, alg: jws::Algorithm) -> Option<&Jwk> {
        match kid {
            Some(kid) => get_key_by_id_impl(&self.keys, kid, alg),
            None => get_key_impl(&self.keys, alg),
        }
    }
}

fn get_key_by_id_impl<'a>(keys: &'a [Jwk], kid: &KeyIdRef, alg: jws::Algorithm) -> Option<&'a Jwk> {
    let mut best: Option<(u32, &Jwk)> = None;

    'candidate: for key in keys.iter().filter(|k| k.is_compatible(alg)) {
        let mut score = 0;

        if let Some(declared) = key.key_id() {
            if declared == kid {
                score += 4;
            } else {
                continue 'candidate;
            }
        }

        if let Some(declared) = key.algorithm() {
            if declared == alg {
                score += 2;
            } else {
                continue 'candidate;
            }
        }

        if let Some(declared) = key.usage() {
            if declared == alg.to_usage() {
                score += 1;
            } else {
                continue 'candidate;
            }
        }

        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, key));
        }
    }

    best.map(|(_, key)| key)
}

fn get_key_impl(keys: &[Jwk], alg: jws::Algorithm) -> Option<&Jwk> {
    let mut best: Option<(u32, &Jwk)> = None;

    'candidate: for key in keys.iter().filter(|k| k.is_compatible(alg)) {
        let mut score = 0;

        if let Some(declared) = key.algorithm() {
            if declared == alg {
                score += 2;
            } else {
                continue 'candidate;
            }
        }

        if let Some(declared) = key.usage() {
            if declared == alg.to_usage() {
                score += 1;
            } else {
                continue 'candidate;
            }
        }

        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, key));
        }
    }

    best.map(|(_, key)| key)
}

fn deserialize_keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Jwk>, D::Error> {
    struct Visitor;

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Vec<Jwk>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a sequence of JSON Web Keys")
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut keys = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            let mut index = 0_usize;

            while let Some(maybe) = seq.next_element::<MaybeJwk>()? {
                match maybe {
                    MaybeJwk::Jwk(key) => keys.push(key),
                    MaybeJwk::Unknown(key) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            jwks.idx = index,
                            jwk.kid = ?key.kid,
                            "jwk.use" = ?key.usage,
                            jwk.alg = ?key.alg,
                            "ignoring unknown JWK"
                        );
                        #[cfg(not(feature = "tracing"))]
                        let _ = (index, key);
                    }
                }
                index += 1;
            }

            Ok(keys)
        }
    }

    deserializer.deserialize_seq(Visitor)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeJwk {
    Jwk(Jwk),
    Unknown(JwkLike),
}

/// The identifying parameters of a key that could not be understood
#[derive(Debug, Deserialize)]
struct JwkLike {
    #[serde(default)]
    kid: Option<String>,

    #[serde(rename = "use", default)]
    usage: Option<String>,

    #[serde(default)]
    alg: Option<String>,
}

//! Key Parser
//!
//! Decodes an uploaded armored block into the keys it contains. Only the
//! fingerprints are needed; the stored value is always the original text.

use std::io::Cursor;

use pgp::types::KeyTrait;
use pgp::{Deserializable, SignedPublicKey};

use crate::error::{PksError, Result};
use crate::rowkey::Fingerprint;

/// One key found in an uploaded block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntity {
    pub fingerprint: Fingerprint,
}

/// Armored text → keys, in input order
pub trait KeyParser: Send + Sync {
    fn parse(&self, armored: &str) -> Result<Vec<KeyEntity>>;
}

/// OpenPGP public key blocks (RFC 4880 ASCII armor)
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenPgpParser;

impl KeyParser for OpenPgpParser {
    fn parse(&self, armored: &str) -> Result<Vec<KeyEntity>> {
        let (keys, _headers) = SignedPublicKey::from_armor_many(Cursor::new(armored.as_bytes()))
            .map_err(|e| PksError::InvalidArmor(e.to_string()))?;

        keys.map(|key| {
            let key = key.map_err(|e| PksError::InvalidArmor(e.to_string()))?;
            Ok(KeyEntity {
                fingerprint: Fingerprint::new(key.fingerprint()),
            })
        })
        .collect()
    }
}

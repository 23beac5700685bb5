//! Row Key Codec
//!
//! Maps key fingerprints onto store row keys and hex key identifiers onto
//! row-key scan ranges.
//!
//! ## Layout
//! Row keys are fingerprints with their byte order reversed:
//! ```text
//! fingerprint  52 BA 08 94 ... 06 FC 81 1E
//! row key      1E 81 FC 06 ... 94 08 BA 52
//! ```
//! Clustered fingerprints are spread across the ordered key space, and an
//! identifier of `L` bytes still selects a contiguous range of row keys:
//! every row whose key begins with the reversed identifier.

use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{PksError, Result};

/// Fixed-length identifier of a key's primary identity
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Uppercase hex, the form key servers print fingerprints in
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Half-open row-key range `[start, end)`
///
/// `end == None` means the range has no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// Range matching every key that begins with `prefix`
    pub fn prefix(prefix: Vec<u8>) -> Self {
        let end = successor(&prefix);
        Self { start: prefix, end }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice()
            && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// A range whose end sorts at or before its start selects nothing
    pub fn is_empty(&self) -> bool {
        matches!(&self.end, Some(end) if *end <= self.start)
    }

    /// Bounds usable with `BTreeMap::range`
    ///
    /// Callers must check `is_empty` first; `BTreeMap::range` panics on an
    /// inverted range.
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }
}

/// Row key for a fingerprint: its bytes in reverse order
pub fn encode_row_key(fingerprint: &Fingerprint) -> Vec<u8> {
    fingerprint.as_bytes().iter().rev().copied().collect()
}

/// Turn a (possibly partial) hex key identifier into a row-key scan range
///
/// Accepts an optional `0x` prefix. The identifier is decoded, reversed to
/// form the start key, and the end key is the start key plus one.
pub fn decode_lookup_range(key_id: &str) -> Result<KeyRange> {
    let digits = key_id
        .strip_prefix("0x")
        .or_else(|| key_id.strip_prefix("0X"))
        .unwrap_or(key_id);

    let mut start = hex::decode(digits)?;
    if start.is_empty() {
        return Err(PksError::EmptyKeyId);
    }
    start.reverse();

    Ok(KeyRange::prefix(start))
}

/// Successor of `key` among byte strings of the same length
///
/// Increments from the last byte with carry toward the first. Returns
/// `None` when every byte is `0xFF`: the carry leaves the key and there is
/// no upper bound.
pub fn successor(key: &[u8]) -> Option<Vec<u8>> {
    let mut next = key.to_vec();
    for byte in next.iter_mut().rev() {
        if *byte == u8::MAX {
            *byte = 0;
        } else {
            *byte += 1;
            return Some(next);
        }
    }
    None
}

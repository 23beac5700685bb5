//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{PksError, Result};
use crate::store::RowMutation;

/// Record header: LSN (8) + CRC (4) + data length (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL: one mutation batch against one keyspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,

    pub keyspace: String,

    pub mutations: Vec<RowMutation>,
}

impl WalEntry {
    pub fn new(lsn: u64, keyspace: impl Into<String>, mutations: Vec<RowMutation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            timestamp,
            keyspace: keyspace.into(),
            mutations,
        }
    }

    /// Encode as a complete record (header + data)
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let lsn_bytes = self.lsn.to_be_bytes();

        let mut record = Vec::with_capacity(HEADER_SIZE + data.len());
        record.extend_from_slice(&lsn_bytes);
        record.extend_from_slice(&compute_crc(&lsn_bytes, &data).to_be_bytes());
        record.extend_from_slice(&(data.len() as u32).to_be_bytes());
        record.extend_from_slice(&data);
        Ok(record)
    }

    /// Decode the data section of a record, verifying it against its header
    pub fn decode(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = compute_crc(&lsn.to_be_bytes(), data);
        if actual != crc {
            return Err(PksError::WalCorruption(format!(
                "CRC mismatch for LSN {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)?;
        if entry.lsn != lsn {
            return Err(PksError::WalCorruption(format!(
                "LSN mismatch: header {}, body {}",
                lsn, entry.lsn
            )));
        }
        Ok(entry)
    }
}

fn compute_crc(lsn_bytes: &[u8], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(lsn_bytes);
    hasher.update(data);
    hasher.finalize()
}

//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use super::{WalEntry, WalReader};
use crate::error::{PksError, Result};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    ///
    /// Framing after a bad entry cannot be trusted, so nothing past it is
    /// replayed.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut result = RecoveryResult::default();
        if !path.exists() {
            return Ok((Vec::new(), result));
        }

        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(PksError::WalCorruption(reason)) => {
                    tracing::warn!(
                        "WAL {} corrupted after LSN {}: {}",
                        path.display(),
                        result.last_lsn,
                        reason
                    );
                    result.entries_corrupted += 1;
                    break;
                }
                Err(PksError::Serialization(e)) => {
                    tracing::warn!(
                        "WAL {} entry after LSN {} undecodable: {}",
                        path.display(),
                        result.last_lsn,
                        e
                    );
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if reader.position() < reader.len() {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(reader.position())?;
            file.sync_all()?;
            result.was_truncated = true;
        }

        Ok((entries, result))
    }
}

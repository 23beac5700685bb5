//! Snapshot files
//!
//! A checkpoint of every store-node keyspace, written when the WAL grows
//! past its limit and on shutdown.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                       │
//! │   Magic: "PKSS" (4) | Version: u16 (2) | DataCRC: u32 (4)│
//! ├─────────────────────────────────────────────────────────┤
//! │ Data (bincode)                                          │
//! │   last_lsn | [(keyspace, [row mutation])]               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! Snapshots are written to a temporary file and renamed into place, so a
//! crash leaves either the old or the new snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PksError, Result};
use crate::store::RowMutation;

/// Magic bytes identifying a snapshot file
const MAGIC: &[u8; 4] = b"PKSS";

/// Current snapshot format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + DataCRC (4)
const HEADER_SIZE: usize = 10;

/// Contents of a snapshot
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// WAL entries up to and including this LSN are contained in the snapshot
    pub last_lsn: u64,

    /// Every row of every keyspace
    pub keyspaces: Vec<(String, Vec<RowMutation>)>,
}

impl Snapshot {
    /// Atomically replace the snapshot at `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self)?;
        let tmp_path = path.with_extension("tmp");

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(MAGIC)?;
            file.write_all(&VERSION.to_le_bytes())?;
            file.write_all(&crc32fast::hash(&data).to_le_bytes())?;
            file.write_all(&data)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        if let Some(dir) = path.parent() {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }

    /// Load the snapshot at `path`, if one exists
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_SIZE || &bytes[0..4] != MAGIC {
            return Err(PksError::Snapshot(format!(
                "{} is not a snapshot file",
                path.display()
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(PksError::Snapshot(format!(
                "Unsupported snapshot version {}",
                version
            )));
        }

        let crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let data = &bytes[HEADER_SIZE..];
        if crc32fast::hash(data) != crc {
            return Err(PksError::Snapshot(format!(
                "Checksum mismatch in {}",
                path.display()
            )));
        }

        Ok(Some(bincode::deserialize(data)?))
    }
}

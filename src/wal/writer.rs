//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::WalEntry;
use crate::config::WalSyncStrategy;
use crate::error::Result;
use crate::store::RowMutation;

/// Writes entries to the WAL file
pub struct WalWriter {
    file: BufWriter<File>,
    path: PathBuf,

    /// LSN assigned to the next appended entry
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    /// Current file size in bytes
    size: u64,
}

impl WalWriter {
    /// Open or create a WAL file, continuing numbering at `next_lsn`
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file: BufWriter::new(file),
            path: path.to_path_buf(),
            next_lsn,
            sync_strategy,
            unsynced: 0,
            size,
        })
    }

    /// Append a mutation batch to the WAL
    ///
    /// Returns the logged entry with its assigned LSN.
    pub fn append(&mut self, keyspace: &str, mutations: Vec<RowMutation>) -> Result<WalEntry> {
        let entry = WalEntry::new(self.next_lsn, keyspace, mutations);
        let record = entry.encode()?;

        self.file.write_all(&record)?;
        self.file.flush()?;
        self.next_lsn += 1;
        self.size += record.len() as u64;
        self.unsynced += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync()?,
            WalSyncStrategy::EveryNEntries { .. } => {}
        }

        Ok(entry)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (after a snapshot made them durable)
    ///
    /// LSN numbering continues where it was.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().set_len(0)?;
        self.file.get_ref().sync_all()?;
        self.size = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN of the last appended entry (0 before the first append)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn.saturating_sub(1)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

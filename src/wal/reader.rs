//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::{WalEntry, HEADER_SIZE};
use crate::error::{PksError, Result};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset of the first byte after the last fully read entry
    position: u64,

    len: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            len,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn header or body and
    /// a checksum mismatch are reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.position >= self.len {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        self.read_exact(&mut header, "header")?;

        let mut lsn_bytes = [0u8; 8];
        lsn_bytes.copy_from_slice(&header[0..8]);
        let lsn = u64::from_be_bytes(lsn_bytes);
        let crc = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let data_len = u32::from_be_bytes([header[12], header[13], header[14], header[15]]) as u64;

        let remaining = self.len - self.position - HEADER_SIZE as u64;
        if data_len > remaining {
            return Err(PksError::WalCorruption(format!(
                "Torn entry at offset {}: {} data bytes declared, {} present",
                self.position, data_len, remaining
            )));
        }

        let mut data = vec![0u8; data_len as usize];
        self.read_exact(&mut data, "data")?;

        let entry = WalEntry::decode(lsn, crc, &data)?;
        self.position += HEADER_SIZE as u64 + data_len;
        Ok(Some(entry))
    }

    /// Offset just past the last valid entry read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total file length when opened
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(PksError::WalCorruption(
                format!("Torn {} at offset {}", what, self.position),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

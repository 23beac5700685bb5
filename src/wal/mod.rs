//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for the store node through append-only logging.
//!
//! ## Responsibilities
//! - Append every mutation batch before it reaches the memtable
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering against snapshots
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! The CRC covers the LSN bytes and the data.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::WalReader;
pub use recovery::{RecoveryResult, WalRecovery};

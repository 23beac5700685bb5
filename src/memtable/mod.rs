//! MemTable Module
//!
//! In-memory wide-column table shared by the in-process store and the
//! store node.
//!
//! ## Responsibilities
//! - Ordered rows per column family (range scans need key order)
//! - Last-write-wins resolution of column versions by timestamp
//! - Single-writer/multi-reader access pattern
//! - Export of every cell for snapshots
//!
//! ## Data Structure Choice
//! Nested BTreeMaps behind one RwLock:
//! ```text
//! family → row key → column name → Cell
//! ```

mod table;

pub use table::ColumnTable;

/// Latest version of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp: i64,
}

impl Cell {
    /// Whether this version replaces `current`
    ///
    /// The newer timestamp wins; on a tie the greater value wins so that
    /// every replica picks the same version.
    pub fn supersedes(&self, current: &Cell) -> bool {
        self.timestamp > current.timestamp
            || (self.timestamp == current.timestamp && self.value > current.value)
    }
}

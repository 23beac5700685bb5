//! In-process store
//!
//! A single-replica keyspace kept in a [`ColumnTable`]. Used by tests and
//! by `--store-server memory` for local experiments.

use super::{ConsistencyLevel, KeySlice, KeyStore, RowMutation, StoreResult};
use crate::memtable::ColumnTable;
use crate::rowkey::KeyRange;

/// Store backed by process memory; every consistency level is met by the
/// single local replica.
#[derive(Default)]
pub struct MemoryStore {
    table: ColumnTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored in a column family
    pub fn row_count(&self, column_family: &str) -> usize {
        self.table.row_count(column_family)
    }
}

impl KeyStore for MemoryStore {
    fn batch_mutate(
        &self,
        mutations: &[RowMutation],
        _consistency: ConsistencyLevel,
    ) -> StoreResult<()> {
        for mutation in mutations {
            self.table.apply(mutation);
        }
        Ok(())
    }

    fn range_scan(
        &self,
        column_family: &str,
        columns: &[Vec<u8>],
        range: &KeyRange,
        _consistency: ConsistencyLevel,
    ) -> StoreResult<Vec<KeySlice>> {
        Ok(self.table.scan(column_family, columns, range))
    }
}

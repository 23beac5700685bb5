//! ColumnTable implementation
//!
//! BTreeMap-based wide-column table with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::Cell;
use crate::rowkey::KeyRange;
use crate::store::{Column, KeySlice, RowMutation};

type Row = BTreeMap<Vec<u8>, Cell>;
type Family = BTreeMap<Vec<u8>, Row>;

/// In-memory wide-column table
pub struct ColumnTable {
    families: RwLock<BTreeMap<String, Family>>,

    /// Approximate payload size in bytes (keys + values of live cells)
    size: AtomicUsize,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Apply a row mutation (write lock)
    ///
    /// Each column replaces the stored version only if it supersedes it.
    /// Returns the approximate table size after the write.
    pub fn apply(&self, mutation: &RowMutation) -> usize {
        let mut families = self.families.write();
        let row = families
            .entry(mutation.column_family.clone())
            .or_default()
            .entry(mutation.row_key.clone())
            .or_default();

        for column in &mutation.columns {
            let cell = Cell {
                value: column.value.clone(),
                timestamp: column.timestamp,
            };

            match row.get_mut(&column.name) {
                Some(current) => {
                    if cell.supersedes(current) {
                        let old_len = current.value.len();
                        let new_len = cell.value.len();
                        *current = cell;
                        if new_len >= old_len {
                            self.size.fetch_add(new_len - old_len, Ordering::Relaxed);
                        } else {
                            self.size.fetch_sub(old_len - new_len, Ordering::Relaxed);
                        }
                    }
                }
                None => {
                    let added = mutation.row_key.len() + column.name.len() + cell.value.len();
                    row.insert(column.name.clone(), cell);
                    self.size.fetch_add(added, Ordering::Relaxed);
                }
            }
        }

        self.size.load(Ordering::Relaxed)
    }

    /// Scan rows of a family within `range` (read lock)
    ///
    /// `columns` filters the returned columns; empty means all of them.
    pub fn scan(&self, family: &str, columns: &[Vec<u8>], range: &KeyRange) -> Vec<KeySlice> {
        if range.is_empty() {
            return Vec::new();
        }

        let families = self.families.read();
        let Some(rows) = families.get(family) else {
            return Vec::new();
        };

        let mut slices = Vec::new();
        for (row_key, row) in rows.range::<[u8], _>(range.bounds()) {
            let selected: Vec<Column> = row
                .iter()
                .filter(|(name, _)| columns.is_empty() || columns.contains(*name))
                .map(|(name, cell)| Column {
                    name: name.clone(),
                    value: cell.value.clone(),
                    timestamp: cell.timestamp,
                })
                .collect();

            if !selected.is_empty() {
                slices.push(KeySlice {
                    row_key: row_key.clone(),
                    columns: selected,
                });
            }
        }
        slices
    }

    /// Every row as a mutation carrying all its cells, in key order
    ///
    /// Replaying the result through `apply` reproduces the table.
    pub fn export(&self) -> Vec<RowMutation> {
        let families = self.families.read();
        let mut rows = Vec::new();
        for (family, family_rows) in families.iter() {
            for (row_key, row) in family_rows {
                rows.push(RowMutation {
                    row_key: row_key.clone(),
                    column_family: family.clone(),
                    columns: row
                        .iter()
                        .map(|(name, cell)| Column {
                            name: name.clone(),
                            value: cell.value.clone(),
                            timestamp: cell.timestamp,
                        })
                        .collect(),
                });
            }
        }
        rows
    }

    /// Number of rows in a family
    pub fn row_count(&self, family: &str) -> usize {
        self.families.read().get(family).map_or(0, |rows| rows.len())
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.families.read().values().all(|rows| rows.is_empty())
    }
}

impl Default for ColumnTable {
    fn default() -> Self {
        Self::new()
    }
}

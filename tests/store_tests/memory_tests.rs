//! Tests for MemoryStore
//!
//! These tests verify:
//! - Mutations are visible to range scans
//! - Last write wins by timestamp, ties broken by value
//! - Column filtering and range bounds

use pksd::rowkey::KeyRange;
use pksd::store::{Column, ConsistencyLevel, KeyStore, MemoryStore, RowMutation};

// =============================================================================
// Helper Functions
// =============================================================================

fn mutation(row_key: &[u8], column: &[u8], value: &[u8], timestamp: i64) -> RowMutation {
    RowMutation {
        row_key: row_key.to_vec(),
        column_family: "keys".to_string(),
        columns: vec![Column {
            name: column.to_vec(),
            value: value.to_vec(),
            timestamp,
        }],
    }
}

fn write(store: &MemoryStore, mutations: &[RowMutation]) {
    store.batch_mutate(mutations, ConsistencyLevel::One).unwrap();
}

fn scan_all(store: &MemoryStore, columns: &[Vec<u8>]) -> Vec<pksd::store::KeySlice> {
    store
        .range_scan("keys", columns, &KeyRange::new(Vec::new(), None), ConsistencyLevel::One)
        .unwrap()
}

// =============================================================================
// Write / Scan Tests
// =============================================================================

#[test]
fn test_scan_returns_rows_in_key_order() {
    let store = MemoryStore::new();
    write(
        &store,
        &[
            mutation(b"c", b"keydata", b"3", 1),
            mutation(b"a", b"keydata", b"1", 1),
            mutation(b"b", b"keydata", b"2", 1),
        ],
    );

    let keys: Vec<Vec<u8>> = scan_all(&store, &[]).into_iter().map(|s| s.row_key).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_scan_honours_half_open_range() {
    let store = MemoryStore::new();
    write(
        &store,
        &[
            mutation(&[0x10], b"keydata", b"low", 1),
            mutation(&[0x10, 0xFF], b"keydata", b"inside", 1),
            mutation(&[0x11], b"keydata", b"end", 1),
        ],
    );

    let slices = store
        .range_scan(
            "keys",
            &[],
            &KeyRange::prefix(vec![0x10]),
            ConsistencyLevel::Quorum,
        )
        .unwrap();

    assert_eq!(slices.len(), 2);
    assert_eq!(slices[1].row_key, vec![0x10, 0xFF]);
}

#[test]
fn test_inverted_range_is_empty() {
    let store = MemoryStore::new();
    write(&store, &[mutation(b"a", b"keydata", b"1", 1)]);

    let range = KeyRange::new(b"z".to_vec(), Some(b"a".to_vec()));
    let slices = store
        .range_scan("keys", &[], &range, ConsistencyLevel::One)
        .unwrap();

    assert!(slices.is_empty());
}

#[test]
fn test_column_filter_omits_rows_without_requested_columns() {
    let store = MemoryStore::new();
    write(
        &store,
        &[
            mutation(b"a", b"keydata", b"1", 1),
            mutation(b"a", b"comment", b"x", 1),
            mutation(b"b", b"comment", b"y", 1),
        ],
    );

    let slices = scan_all(&store, &[b"keydata".to_vec()]);

    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].columns.len(), 1);
    assert_eq!(slices[0].columns[0].name, b"keydata");
}

#[test]
fn test_unknown_column_family_is_empty() {
    let store = MemoryStore::new();
    write(&store, &[mutation(b"a", b"keydata", b"1", 1)]);

    let slices = store
        .range_scan("other", &[], &KeyRange::new(Vec::new(), None), ConsistencyLevel::One)
        .unwrap();

    assert!(slices.is_empty());
}

// =============================================================================
// Conflict Resolution Tests
// =============================================================================

#[test]
fn test_newer_timestamp_wins() {
    let store = MemoryStore::new();
    write(&store, &[mutation(b"a", b"keydata", b"new", 20)]);
    write(&store, &[mutation(b"a", b"keydata", b"old", 10)]);

    let slices = scan_all(&store, &[]);
    assert_eq!(slices[0].columns[0].value, b"new");
    assert_eq!(slices[0].columns[0].timestamp, 20);
}

#[test]
fn test_timestamp_tie_keeps_greater_value() {
    let store = MemoryStore::new();
    write(&store, &[mutation(b"a", b"keydata", b"bbb", 5)]);
    write(&store, &[mutation(b"a", b"keydata", b"aaa", 5)]);

    let slices = scan_all(&store, &[]);
    assert_eq!(slices[0].columns[0].value, b"bbb");
    assert_eq!(store.row_count("keys"), 1);
}

//! Tests for Engine
//!
//! These tests verify:
//! - Batch writes and range scans per keyspace
//! - Schema validation (keyspace, column family, row key, range)
//! - Crash recovery from the WAL
//! - Checkpoints (explicit, size-triggered, on close)
//! - Concurrent writers

use std::sync::Arc;
use std::thread;

use pksd::config::{NodeConfig, WalSyncStrategy};
use pksd::engine::Engine;
use pksd::rowkey::KeyRange;
use pksd::store::{BackendFault, Column, RowMutation};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config(dir: &TempDir) -> NodeConfig {
    NodeConfig::builder()
        .data_dir(dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn mutation(row_key: &[u8], value: &str, timestamp: i64) -> RowMutation {
    RowMutation {
        row_key: row_key.to_vec(),
        column_family: "keys".to_string(),
        columns: vec![Column {
            name: b"keydata".to_vec(),
            value: value.as_bytes().to_vec(),
            timestamp,
        }],
    }
}

fn everything() -> KeyRange {
    KeyRange::new(Vec::new(), None)
}

fn values(engine: &Engine, keyspace: &str) -> Vec<String> {
    engine
        .range_slices(keyspace, "keys", &[], &everything())
        .unwrap()
        .into_iter()
        .flat_map(|slice| slice.columns)
        .map(|column| String::from_utf8(column.value).unwrap())
        .collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("node");

    let _engine = Engine::open(NodeConfig::builder().data_dir(&data_dir).build()).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("wal.log").exists());
}

#[test]
fn test_engine_requires_a_keyspace() {
    let temp_dir = TempDir::new().unwrap();
    let config = NodeConfig::builder()
        .data_dir(temp_dir.path())
        .keyspaces(Vec::<String>::new())
        .build();

    assert!(Engine::open(config).is_err());
}

#[test]
fn test_batch_then_scan() {
    let (_temp, engine) = setup_temp_engine();

    engine
        .batch_mutate("pgpkeys", vec![mutation(b"b", "two", 1), mutation(b"a", "one", 1)])
        .unwrap();

    assert_eq!(values(&engine, "pgpkeys"), vec!["one", "two"]);
    assert_eq!(engine.row_count("pgpkeys", "keys"), 2);
}

#[test]
fn test_keyspaces_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let config = NodeConfig::builder()
        .data_dir(temp_dir.path())
        .keyspaces(["pgpkeys", "staging"])
        .build();
    let engine = Engine::open(config).unwrap();

    engine.batch_mutate("staging", vec![mutation(b"a", "staged", 1)]).unwrap();

    assert!(values(&engine, "pgpkeys").is_empty());
    assert_eq!(values(&engine, "staging"), vec!["staged"]);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_unknown_keyspace_is_invalid_request() {
    let (_temp, engine) = setup_temp_engine();

    let err = engine
        .batch_mutate("nope", vec![mutation(b"a", "x", 1)])
        .unwrap_err();

    assert_eq!(
        err,
        BackendFault::InvalidRequest("Keyspace nope does not exist".to_string())
    );
}

#[test]
fn test_unconfigured_column_family_is_invalid_request() {
    let (_temp, engine) = setup_temp_engine();
    let mut bad = mutation(b"a", "x", 1);
    bad.column_family = "sigs".to_string();

    let err = engine.batch_mutate("pgpkeys", vec![bad]).unwrap_err();

    assert!(matches!(err, BackendFault::InvalidRequest(_)));
    assert_eq!(engine.row_count("pgpkeys", "keys"), 0);
}

#[test]
fn test_empty_row_key_rejects_whole_batch() {
    let (_temp, engine) = setup_temp_engine();

    let err = engine
        .batch_mutate("pgpkeys", vec![mutation(b"a", "x", 1), mutation(b"", "y", 1)])
        .unwrap_err();

    assert!(matches!(err, BackendFault::InvalidRequest(_)));
    assert_eq!(engine.row_count("pgpkeys", "keys"), 0);
}

#[test]
fn test_inverted_range_is_invalid_request() {
    let (_temp, engine) = setup_temp_engine();

    let range = KeyRange::new(b"z".to_vec(), Some(b"a".to_vec()));
    let err = engine.range_slices("pgpkeys", "keys", &[], &range).unwrap_err();

    assert!(matches!(err, BackendFault::InvalidRequest(_)));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_from_wal_after_crash() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&temp_dir)).unwrap();
        engine.batch_mutate("pgpkeys", vec![mutation(b"a", "one", 1)]).unwrap();
        engine.batch_mutate("pgpkeys", vec![mutation(b"b", "two", 1)]).unwrap();
        // Dropped without close
    }

    let engine = Engine::open(config(&temp_dir)).unwrap();
    assert_eq!(values(&engine, "pgpkeys"), vec!["one", "two"]);
}

#[test]
fn test_recovery_keeps_last_write() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&temp_dir)).unwrap();
        engine.batch_mutate("pgpkeys", vec![mutation(b"a", "new", 9)]).unwrap();
        engine.batch_mutate("pgpkeys", vec![mutation(b"a", "old", 3)]).unwrap();
    }

    let engine = Engine::open(config(&temp_dir)).unwrap();
    assert_eq!(values(&engine, "pgpkeys"), vec!["new"]);
}

// =============================================================================
// Checkpoint Tests
// =============================================================================

#[test]
fn test_checkpoint_truncates_wal_and_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&temp_dir)).unwrap();
        engine.batch_mutate("pgpkeys", vec![mutation(b"a", "one", 1)]).unwrap();
        engine.checkpoint().unwrap();
        assert_eq!(engine.wal_size(), 0);

        engine.batch_mutate("pgpkeys", vec![mutation(b"b", "two", 1)]).unwrap();
    }

    assert!(temp_dir.path().join("snapshot.bin").exists());
    let engine = Engine::open(config(&temp_dir)).unwrap();
    assert_eq!(values(&engine, "pgpkeys"), vec!["one", "two"]);
}

#[test]
fn test_wal_limit_triggers_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let config = NodeConfig::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .checkpoint_size_limit(1)
        .build();
    let engine = Engine::open(config.clone()).unwrap();

    engine.batch_mutate("pgpkeys", vec![mutation(b"a", "one", 1)]).unwrap();

    assert_eq!(engine.wal_size(), 0);
    drop(engine);
    let engine = Engine::open(config).unwrap();
    assert_eq!(values(&engine, "pgpkeys"), vec!["one"]);
}

#[test]
fn test_close_checkpoints_pending_writes() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&temp_dir)).unwrap();
    engine.batch_mutate("pgpkeys", vec![mutation(b"a", "one", 1)]).unwrap();

    engine.close().unwrap();

    assert_eq!(engine.wal_size(), 0);
    drop(engine);
    let engine = Engine::open(config(&temp_dir)).unwrap();
    assert_eq!(values(&engine, "pgpkeys"), vec!["one"]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("{}-{:02}", t, i);
                    engine
                        .batch_mutate("pgpkeys", vec![mutation(key.as_bytes(), "v", 1)])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.row_count("pgpkeys", "keys"), 100);
}

//! Tests for RemoteStore against an in-process store node
//!
//! These tests verify:
//! - Writes and scans round-trip through the wire protocol
//! - Node-side validation faults reach the client unchanged
//! - Unreachable and unresponsive nodes map to Unavailable / TimedOut
//! - Sessions closed by the node are transparently replaced

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pksd::config::{NodeConfig, WalSyncStrategy};
use pksd::engine::Engine;
use pksd::error::PksError;
use pksd::network::Server;
use pksd::rowkey::{decode_lookup_range, KeyRange};
use pksd::store::{BackendFault, Column, ConsistencyLevel, KeyStore, RemoteStore, RowMutation};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Test Node
// =============================================================================

struct TestNode {
    addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl TestNode {
    fn start(read_timeout_ms: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let config = NodeConfig::builder()
            .data_dir(dir.path())
            .listen_addr("127.0.0.1:0")
            .max_connections(4)
            .read_timeout_ms(read_timeout_ms)
            .wal_sync_strategy(WalSyncStrategy::EveryWrite)
            .build();
        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            engine,
            shutdown,
            handle: Some(handle),
            _dir: dir,
        }
    }

    fn connect(&self) -> RemoteStore {
        RemoteStore::connect(&self.addr.to_string(), "pgpkeys", TIMEOUT).unwrap()
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn mutation(row_key: &[u8], value: &str) -> RowMutation {
    RowMutation {
        row_key: row_key.to_vec(),
        column_family: "keys".to_string(),
        columns: vec![Column {
            name: b"keydata".to_vec(),
            value: value.as_bytes().to_vec(),
            timestamp: 1,
        }],
    }
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_write_then_scan() {
    let node = TestNode::start(500);
    let store = node.connect();

    store
        .batch_mutate(&[mutation(&[0x1E, 0x81, 0xFC, 0x06, 0x31], "alice")], ConsistencyLevel::One)
        .unwrap();

    let range = decode_lookup_range("06FC811E").unwrap();
    let slices = store
        .range_scan("keys", &[b"keydata".to_vec()], &range, ConsistencyLevel::One)
        .unwrap();

    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].columns[0].value, b"alice");
    assert_eq!(node.engine.row_count("pgpkeys", "keys"), 1);
}

#[test]
fn test_ping() {
    let node = TestNode::start(500);
    let store = node.connect();

    store.ping().unwrap();
    assert_eq!(store.idle_connections(), 1);
}

#[test]
fn test_concurrent_clients_share_pool() {
    let node = TestNode::start(500);
    let store = Arc::new(node.connect());

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .batch_mutate(&[mutation(&[i + 1], "v")], ConsistencyLevel::One)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let slices = store
        .range_scan("keys", &[], &KeyRange::new(Vec::new(), None), ConsistencyLevel::One)
        .unwrap();
    assert_eq!(slices.len(), 4);
    drop(store);
}

// =============================================================================
// Fault Tests
// =============================================================================

#[test]
fn test_unknown_keyspace_fails_at_connect() {
    let node = TestNode::start(500);

    let err = RemoteStore::connect(&node.addr.to_string(), "missing", TIMEOUT)
        .err()
        .unwrap();

    assert!(matches!(
        err,
        PksError::Backend(BackendFault::InvalidRequest(_))
    ));
}

#[test]
fn test_node_validation_fault_is_returned() {
    let node = TestNode::start(500);
    let store = node.connect();

    let err = store
        .batch_mutate(&[mutation(b"", "empty key")], ConsistencyLevel::One)
        .unwrap_err();

    assert_eq!(
        err,
        BackendFault::InvalidRequest("Key may not be empty".to_string())
    );
    // The session survives a fault
    store.ping().unwrap();
}

#[test]
fn test_refused_connection_is_unavailable() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = RemoteStore::connect(&addr.to_string(), "pgpkeys", TIMEOUT)
        .err()
        .unwrap();

    assert!(matches!(err, PksError::Backend(BackendFault::Unavailable)));
}

#[test]
fn test_silent_node_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold connections without answering
    let holder = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(800));
        drop(stream);
    });

    let err = RemoteStore::connect(&addr.to_string(), "pgpkeys", Duration::from_millis(200))
        .err()
        .unwrap();

    assert!(matches!(err, PksError::Backend(BackendFault::TimedOut)));
    holder.join().unwrap();
}

#[test]
fn test_reconnects_after_node_closes_idle_session() {
    let node = TestNode::start(100);
    let store = node.connect();
    store.ping().unwrap();

    // Outlive the node's read timeout so it closes the pooled session
    thread::sleep(Duration::from_millis(400));

    store
        .batch_mutate(&[mutation(b"k", "after idle")], ConsistencyLevel::One)
        .unwrap();
    assert_eq!(node.engine.row_count("pgpkeys", "keys"), 1);
}

#[test]
fn test_oversized_scan_is_reported_as_store_error() {
    let node = TestNode::start(5000);
    let block = "k".repeat(1024 * 1024);
    for i in 0..18u8 {
        node.engine
            .batch_mutate("pgpkeys", vec![mutation(&[0xAA, i], &block)])
            .unwrap();
    }
    let store = RemoteStore::connect(&node.addr.to_string(), "pgpkeys", Duration::from_secs(10))
        .unwrap();

    let err = store
        .range_scan(
            "keys",
            &[b"keydata".to_vec()],
            &KeyRange::prefix(vec![0xAA]),
            ConsistencyLevel::One,
        )
        .unwrap_err();

    assert!(matches!(err, BackendFault::Other(_)), "got {:?}", err);
    // The node answered on the same session
    store.ping().unwrap();
    assert_eq!(store.idle_connections(), 1);
}

//! # pksd
//!
//! An HKP-style public key server backed by an ordered wide-column store:
//! - Clients upload armored OpenPGP key blocks and look them up by full or
//!   partial hex fingerprint
//! - Keys are stored under their reversed fingerprint, so a partial
//!   identifier resolves to a single contiguous row-key range scan
//! - The store is reached through a narrow client trait; a durable store
//!   node (`keystore-node`) ships alongside the key server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 HTTP front end (hyper/tokio)                 │
//! │           /pks/add   /pks/lookup   /pks/<other>              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  spawn_blocking
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       PksHandler                             │
//! │     KeyParser ─► rowkey codec ─► KeyStore    MetricsSink     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ MemoryStore │          │ RemoteStore │──── framed TCP ────┐
//!   └─────────────┘          └─────────────┘                    │
//!                                                               ▼
//!                            ┌─────────────────────────────────────┐
//!                            │ keystore-node: Engine               │
//!                            │   WAL (append) ─► ColumnTable       │
//!                            │   snapshot checkpoints              │
//!                            └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod rowkey;
pub mod parser;
pub mod metrics;
pub mod store;
pub mod pks;
pub mod http;

pub mod memtable;
pub mod wal;
pub mod snapshot;
pub mod protocol;
pub mod engine;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, NodeConfig};
pub use engine::Engine;
pub use error::{PksError, Result};
pub use metrics::{Counters, MetricsSink};
pub use parser::{KeyEntity, KeyParser, OpenPgpParser};
pub use pks::PksHandler;
pub use rowkey::{decode_lookup_range, encode_row_key, Fingerprint, KeyRange};
pub use store::{BackendFault, KeyStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pksd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Store Module
//!
//! The narrow client interface the key server uses to reach its
//! wide-column store, plus the types shared with the store node.
//!
//! ## Data Model
//! ```text
//! keyspace
//!   └── column family ("keys")
//!         └── row key (reversed fingerprint)
//!               └── column ("keydata") = value @ timestamp
//! ```
//!
//! ## Implementations
//! - [`MemoryStore`]: in-process store, no durability
//! - [`RemoteStore`]: pooled TCP client for a `keystore-node`

mod memory;
mod remote;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::Result;
use crate::rowkey::KeyRange;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// Column family holding uploaded key blocks
pub const KEYS_COLUMN_FAMILY: &str = "keys";

/// Column holding the full uploaded key block
pub const KEYDATA_COLUMN: &[u8] = b"keydata";

/// `--store-server` value selecting the in-process store
pub const MEMORY_STORE: &str = "memory";

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, BackendFault>;

/// Number of replica acknowledgements required for an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    #[default]
    One,
    Quorum,
    All,
}

/// A single versioned column value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: Vec<u8>,
    pub value: Vec<u8>,

    /// Write timestamp (microseconds since the Unix epoch)
    pub timestamp: i64,
}

/// Columns written to one row of one column family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMutation {
    pub row_key: Vec<u8>,
    pub column_family: String,
    pub columns: Vec<Column>,
}

/// One row returned by a range scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySlice {
    pub row_key: Vec<u8>,
    pub columns: Vec<Column>,
}

/// Faults reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BackendFault {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unavailable")]
    Unavailable,

    #[error("Timed out")]
    TimedOut,

    #[error("Store error: {0}")]
    Other(String),
}

impl BackendFault {
    /// Counter label for this fault
    pub fn label(&self) -> &'static str {
        match self {
            BackendFault::InvalidRequest(_) => "invalid-request",
            BackendFault::Unavailable => "unavailable",
            BackendFault::TimedOut => "timeout",
            BackendFault::Other(_) => "os-error",
        }
    }
}

/// Client capability for a wide-column store
///
/// Both calls may block on network I/O. Implementations own their retry
/// policy and must be safe to share between request handlers.
pub trait KeyStore: Send + Sync {
    /// Apply every mutation in the batch
    fn batch_mutate(
        &self,
        mutations: &[RowMutation],
        consistency: ConsistencyLevel,
    ) -> StoreResult<()>;

    /// Rows of `column_family` whose key lies in `range`, in key order
    ///
    /// Only the named columns are returned; an empty list selects every
    /// column. Rows with none of the requested columns are omitted.
    fn range_scan(
        &self,
        column_family: &str,
        columns: &[Vec<u8>],
        range: &KeyRange,
        consistency: ConsistencyLevel,
    ) -> StoreResult<Vec<KeySlice>>;
}

/// Open the store named by the configuration
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyStore>> {
    if config.store_server == MEMORY_STORE {
        tracing::warn!("Using the in-process store; keys are lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = RemoteStore::connect(
        &config.store_server,
        &config.keyspace,
        config.store_timeout(),
    )?;
    Ok(Arc::new(store))
}

//! PKS Handler
//!
//! The two key server operations, independent of HTTP:
//!
//! ```text
//!   add(keytext) ──► parse ──► one row per key ──► batch_mutate
//!                                (reversed fp → keydata)
//!
//!   get(key_id)  ──► decode range ──► range_scan ──► raw keydata to sink
//! ```
//!
//! Both calls block on the store and are meant to run on a blocking pool.
//! They hold no locks of their own; concurrent adds of the same key both
//! write, and the store keeps the newest.

mod ingest;
mod lookup;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metrics::MetricsSink;
use crate::parser::KeyParser;
use crate::store::KeyStore;

/// Labels for requests rejected before reaching the store
pub const LABEL_MISSING_KEYTEXT: &str = "missing-keytext";
pub const LABEL_INVALID_ARMOR: &str = "invalid-armored-key";
pub const LABEL_MISSING_SEARCH: &str = "missing-search";
pub const LABEL_INVALID_KEYID: &str = "invalid-keyid";

/// Key server operations over an injected store, parser and metrics sink
pub struct PksHandler {
    store: Arc<dyn KeyStore>,
    parser: Arc<dyn KeyParser>,
    metrics: Arc<dyn MetricsSink>,
}

impl PksHandler {
    pub fn new(
        store: Arc<dyn KeyStore>,
        parser: Arc<dyn KeyParser>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            parser,
            metrics,
        }
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }
}

/// Write timestamp: microseconds since the Unix epoch
fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

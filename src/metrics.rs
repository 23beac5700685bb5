//! Metrics
//!
//! Monotonic request counters, constructed once per process and handed to
//! the components that update them.
//!
//! Counter names are kept stable for existing dashboards, including the
//! historical `pkcs` spelling of the add error maps.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

/// Every request under `/pks/`
pub const REQUESTS: &str = "num-pks-reqs";

/// Requests for an unsupported operation
pub const UNKNOWN_REQUESTS: &str = "num-pks-unknown-reqs";

pub const ADD_REQUESTS: &str = "num-pks-add-reqs";

pub const LOOKUP_REQUESTS: &str = "num-pks-lookup-reqs";

/// Rows returned across all lookups
pub const LOOKUP_KEYS_FOUND: &str = "num-pks-lookup-keys-found";

/// Add requests rejected before reaching the store, by reason
pub const ADD_REQUEST_ERRORS: &str = "num-pkcs-add-request-errors";

/// Add requests failed by the store, by fault
pub const ADD_ERRORS: &str = "num-pkcs-add-errors";

/// Failed lookups, by reason or fault
pub const LOOKUP_ERRORS: &str = "num-pks-lookup-errors";

/// Destination for counter updates
///
/// Implementations must not lose concurrent increments.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    fn increment_by(&self, name: &str, n: u64);

    fn increment_labeled(&self, map: &str, label: &str, n: u64);
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub labeled: BTreeMap<String, BTreeMap<String, u64>>,
}

/// In-process counters
pub struct Counters {
    values: RwLock<HashMap<String, AtomicU64>>,
    labeled: Mutex<BTreeMap<String, BTreeMap<String, u64>>>,
}

impl Counters {
    /// Counters with every known name registered at zero
    pub fn new() -> Self {
        let values = [
            REQUESTS,
            UNKNOWN_REQUESTS,
            ADD_REQUESTS,
            LOOKUP_REQUESTS,
            LOOKUP_KEYS_FOUND,
        ]
        .into_iter()
        .map(|name| (name.to_string(), AtomicU64::new(0)))
        .collect();

        let labeled = [ADD_REQUEST_ERRORS, ADD_ERRORS, LOOKUP_ERRORS]
            .into_iter()
            .map(|name| (name.to_string(), BTreeMap::new()))
            .collect();

        Self {
            values: RwLock::new(values),
            labeled: Mutex::new(labeled),
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.values
            .read()
            .get(name)
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    pub fn get_labeled(&self, map: &str, label: &str) -> u64 {
        self.labeled
            .lock()
            .get(map)
            .and_then(|labels| labels.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .values
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            counters,
            labeled: self.labeled.lock().clone(),
        }
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for Counters {
    fn increment_by(&self, name: &str, n: u64) {
        if let Some(value) = self.values.read().get(name) {
            value.fetch_add(n, Ordering::Relaxed);
            return;
        }

        self.values
            .write()
            .entry(name.to_string())
            .or_default()
            .fetch_add(n, Ordering::Relaxed);
    }

    fn increment_labeled(&self, map: &str, label: &str, n: u64) {
        let mut labeled = self.labeled.lock();
        *labeled
            .entry(map.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default() += n;
    }
}

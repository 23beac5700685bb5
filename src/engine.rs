//! Engine Module
//!
//! The store node's storage engine: keyspaces of column families kept in
//! memtables, made durable by the WAL and periodic snapshots.
//!
//! ## Responsibilities
//! - Validate requests against the configured schema
//! - Log every mutation batch before applying it
//! - Serve ordered range scans from the memtables
//! - Checkpoint to a snapshot and truncate the WAL when it grows too large
//! - Recover snapshot + WAL on startup

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::NodeConfig;
use crate::error::{PksError, Result};
use crate::memtable::ColumnTable;
use crate::rowkey::KeyRange;
use crate::snapshot::Snapshot;
use crate::store::{BackendFault, KeySlice, RowMutation, StoreResult};
use crate::wal::{WalRecovery, WalWriter};

/// One keyspace: its schema and its rows
struct Keyspace {
    column_families: HashSet<String>,
    table: ColumnTable,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (batch mutate / checkpoint): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable
///
/// - **Reads** (range scans): Concurrent
///   - No write_lock needed
///   - Each memtable uses an internal RwLock
pub struct Engine {
    /// Engine configuration
    config: NodeConfig,

    /// Keyspaces by name; the set is fixed at open
    keyspaces: HashMap<String, Keyspace>,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Serializes write operations (mutations/checkpoints)
    write_lock: Mutex<()>,

    snapshot_path: PathBuf,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_FILENAME: &'static str = "snapshot.bin";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the last snapshot if one exists
    /// 3. Replay WAL entries newer than the snapshot
    /// 4. Ready to serve requests
    pub fn open(config: NodeConfig) -> Result<Self> {
        if config.keyspaces.is_empty() {
            return Err(PksError::Config("at least one keyspace is required".to_string()));
        }

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        let keyspaces: HashMap<String, Keyspace> = config
            .keyspaces
            .iter()
            .map(|name| {
                let keyspace = Keyspace {
                    column_families: config.column_families.iter().cloned().collect(),
                    table: ColumnTable::new(),
                };
                (name.clone(), keyspace)
            })
            .collect();

        // Step 2: Load snapshot
        let snapshot = Snapshot::read(&snapshot_path)?.unwrap_or_default();
        for (name, rows) in &snapshot.keyspaces {
            match keyspaces.get(name) {
                Some(keyspace) => rows.iter().for_each(|row| {
                    keyspace.table.apply(row);
                }),
                None => tracing::warn!("Snapshot keyspace {} is not configured; skipping", name),
            }
        }

        // Step 3: Replay WAL entries the snapshot does not contain
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;
        let mut last_lsn = snapshot.last_lsn;
        let mut replayed = 0u64;
        for entry in entries {
            if entry.lsn <= snapshot.last_lsn {
                continue;
            }
            match keyspaces.get(&entry.keyspace) {
                Some(keyspace) => entry.mutations.iter().for_each(|mutation| {
                    keyspace.table.apply(mutation);
                }),
                None => tracing::warn!(
                    "WAL entry {} targets unconfigured keyspace {}; skipping",
                    entry.lsn,
                    entry.keyspace
                ),
            }
            last_lsn = last_lsn.max(entry.lsn);
            replayed += 1;
        }

        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                "WAL recovery: {} entries recovered, {} replayed, {} corrupted, last_lsn={}",
                recovery.entries_recovered,
                replayed,
                recovery.entries_corrupted,
                recovery.last_lsn
            );
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy, last_lsn + 1)?;

        Ok(Self {
            config,
            keyspaces,
            wal: Mutex::new(wal),
            write_lock: Mutex::new(()),
            snapshot_path,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(NodeConfig::builder().data_dir(path).build())
    }

    pub fn has_keyspace(&self, name: &str) -> bool {
        self.keyspaces.contains_key(name)
    }

    /// Apply a mutation batch to a keyspace
    ///
    /// Steps:
    /// 1. Validate every mutation against the schema
    /// 2. Acquire write lock
    /// 3. Append the batch to the WAL (durability)
    /// 4. Apply to the memtable
    /// 5. Checkpoint if the WAL is over its limit
    pub fn batch_mutate(&self, keyspace: &str, mutations: Vec<RowMutation>) -> StoreResult<()> {
        let ks = self.keyspace(keyspace)?;
        for mutation in &mutations {
            if mutation.row_key.is_empty() {
                return Err(BackendFault::InvalidRequest("Key may not be empty".to_string()));
            }
            ks.check_family(&mutation.column_family)?;
        }
        if mutations.is_empty() {
            return Ok(());
        }

        let _write_guard = self.write_lock.lock();

        let entry = self.wal.lock().append(keyspace, mutations).map_err(|e| {
            tracing::error!("WAL append failed: {}", e);
            BackendFault::Other(e.to_string())
        })?;

        for mutation in &entry.mutations {
            ks.table.apply(mutation);
        }

        // The batch is already durable in the WAL; a failed checkpoint is
        // retried on the next write.
        if self.wal.lock().size() >= self.config.checkpoint_size_limit {
            if let Err(e) = self.checkpoint_internal() {
                tracing::warn!("Checkpoint failed: {}", e);
            }
        }

        Ok(())
    }

    /// Scan a row-key range of one column family
    pub fn range_slices(
        &self,
        keyspace: &str,
        column_family: &str,
        columns: &[Vec<u8>],
        range: &KeyRange,
    ) -> StoreResult<Vec<KeySlice>> {
        let ks = self.keyspace(keyspace)?;
        ks.check_family(column_family)?;
        if range.is_empty() {
            return Err(BackendFault::InvalidRequest(
                "start key must sort before end key".to_string(),
            ));
        }

        Ok(ks.table.scan(column_family, columns, range))
    }

    /// Snapshot every keyspace and truncate the WAL (public API)
    pub fn checkpoint(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.checkpoint_internal()
    }

    /// Internal checkpoint implementation (called with write lock held)
    fn checkpoint_internal(&self) -> Result<()> {
        let mut wal = self.wal.lock();

        let mut keyspaces: Vec<(String, Vec<RowMutation>)> = self
            .keyspaces
            .iter()
            .map(|(name, keyspace)| (name.clone(), keyspace.table.export()))
            .collect();
        keyspaces.sort_by(|a, b| a.0.cmp(&b.0));

        let snapshot = Snapshot {
            last_lsn: wal.current_lsn(),
            keyspaces,
        };
        snapshot.write(&self.snapshot_path)?;
        wal.truncate()?;

        tracing::debug!("Checkpoint written at LSN {}", snapshot.last_lsn);
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints pending WAL entries so the next start needs no replay
    pub fn close(&self) -> Result<()> {
        if self.wal_size() > 0 {
            self.checkpoint()?;
        }
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// Number of rows in a column family of a keyspace
    pub fn row_count(&self, keyspace: &str, column_family: &str) -> usize {
        self.keyspaces
            .get(keyspace)
            .map_or(0, |ks| ks.table.row_count(column_family))
    }

    /// Get the configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn keyspace(&self, name: &str) -> StoreResult<&Keyspace> {
        self.keyspaces
            .get(name)
            .ok_or_else(|| BackendFault::InvalidRequest(format!("Keyspace {} does not exist", name)))
    }
}

impl Keyspace {
    fn check_family(&self, name: &str) -> StoreResult<()> {
        if self.column_families.contains(name) {
            Ok(())
        } else {
            Err(BackendFault::InvalidRequest(format!(
                "unconfigured column family {}",
                name
            )))
        }
    }
}

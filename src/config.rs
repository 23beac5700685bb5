//! Configuration for pksd
//!
//! Centralized configuration with sensible defaults, one struct for the
//! key server and one for the store node.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PksError, Result};

/// Main configuration for the key server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // HTTP Configuration
    // -------------------------------------------------------------------------
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// HTML templates for a web interface; not read by the key server core
    pub template_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Store node address (host:port), or `memory` for an in-process store
    pub store_server: String,

    /// Keyspace selected on every store connection
    pub keyspace: String,

    /// Connect/read/write timeout for store connections (milliseconds)
    pub store_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "[::]:11371".to_string(),
            template_dir: PathBuf::from("/var/www/templates"),
            store_server: "localhost:9160".to_string(),
            keyspace: "pgpkeys".to_string(),
            store_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the HTTP bind address
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Set the template directory
    pub fn template_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_dir = path.into();
        self
    }

    /// Set the store node address
    pub fn store_server(mut self, addr: impl Into<String>) -> Self {
        self.config.store_server = addr.into();
        self
    }

    /// Set the keyspace
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.config.keyspace = keyspace.into();
        self
    }

    /// Set the store timeout (in milliseconds)
    pub fn store_timeout_ms(mut self, ms: u64) -> Self {
        self.config.store_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Configuration for a store node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── snapshot.bin     (last checkpoint)
    pub data_dir: PathBuf,

    /// Keyspaces served by the node
    pub keyspaces: Vec<String>,

    /// Column families present in every keyspace
    pub column_families: Vec<String>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size that triggers a checkpoint (in bytes)
    pub checkpoint_size_limit: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrently served client connections (worker threads)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds); idle sessions are closed
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./keystore_data"),
            keyspaces: vec!["pgpkeys".to_string()],
            column_families: vec!["keys".to_string()],
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_size_limit: 64 * 1024 * 1024, // 64 MB
            listen_addr: "127.0.0.1:9160".to_string(),
            max_connections: 64,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5000,
        }
    }
}

impl NodeConfig {
    /// Create a new node config builder
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }
}

/// Builder for NodeConfig
#[derive(Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the served keyspaces
    pub fn keyspaces<I, S>(mut self, keyspaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keyspaces = keyspaces.into_iter().map(Into::into).collect();
        self
    }

    /// Set the column families of every keyspace
    pub fn column_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.column_families = families.into_iter().map(Into::into).collect();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size that triggers a checkpoint (in bytes)
    pub fn checkpoint_size_limit(mut self, size: u64) -> Self {
        self.config.checkpoint_size_limit = size;
        self
    }

    /// Set the checkpoint trigger in megabytes
    ///
    /// Fails if the byte count does not fit in a `u64`.
    pub fn checkpoint_size_mb(self, mb: u64) -> Result<Self> {
        let bytes = mb.checked_mul(1024 * 1024).ok_or_else(|| {
            PksError::Config(format!("checkpoint size of {} MB is too large", mb))
        })?;
        Ok(self.checkpoint_size_limit(bytes))
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.config
    }
}

//! Configuration for AtlasLedger
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for an AtlasLedger store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── entities.log     (append-only entity log)
    pub data_dir: PathBuf,

    /// Which entity log backend to use
    pub backend: Backend,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the entity log (file backend only)
    pub log_sync_strategy: LogSyncStrategy,
}

/// Entity log backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Records live only in process memory
    Memory,

    /// Records are framed into `{data_dir}/entities.log` and replayed on open
    File,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy)]
pub enum LogSyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasledger_data"),
            backend: Backend::File,
            log_sync_strategy: LogSyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the entity log backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the log sync strategy
    pub fn log_sync_strategy(mut self, strategy: LogSyncStrategy) -> Self {
        self.config.log_sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

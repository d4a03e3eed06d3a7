//! Store Module
//!
//! The public face of the ledger: `append` and `query`.
//!
//! ## Responsibilities
//! - Validate metadata and compute content hashes
//! - Skip duplicate content (idempotent appends)
//! - Resolve ids and versions, write to the log, update both indexes
//! - Capture a snapshot sequence per query and hand back a lazy cursor
//! - Rebuild the indexes from the log on open

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use crate::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::config::{Backend, Config, LogSyncStrategy};
use crate::error::{LedgerError, Result};
use crate::hash::content_hash;
use crate::index::Indexes;
use crate::log::{EntityLog, FileLog, MemoryLog};
use crate::query::{QueryCursor, QueryPlan, QuerySpec};
use crate::record::{ContentHash, Metadata, NewRecord, ID_KEY};

/// The two operations every store backend offers
pub trait EntityStore: Send + Sync {
    /// Record a new version of an entity, or report that identical content
    /// was already recorded
    fn append(&self, data: Value, metadata: Metadata) -> Result<AppendReceipt>;

    /// Run a declarative query against a snapshot of the store
    fn query(&self, spec: &QuerySpec) -> Result<QueryCursor>;
}

/// What an append did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendReceipt {
    pub id: String,
    pub version: u64,

    /// Commit time of the record (ms); for a duplicate, the original's
    pub timestamp: i64,

    pub hash: ContentHash,
    pub sequence: u64,

    /// True when nothing was written because the content was already recorded
    pub duplicate: bool,
}

/// Point-in-time counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Records in the log
    pub records: u64,

    /// Distinct (entity type, id) pairs
    pub entities: u64,

    /// Duplicate appends skipped since open
    pub duplicates_skipped: u64,

    /// Highest committed sequence
    pub last_sequence: u64,
}

/// Append-only, versioned entity store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Appends**: serialized by `write_lock`, so sequence and per-id version
///   assignment never race. Log write, index update and the `committed`
///   bump happen in that order under the lock.
/// - **Queries**: read `committed` once (the snapshot), take the index read
///   lock just long enough to pick candidate sequences, then stream from the
///   log without holding any store lock.
pub struct Store {
    /// Source of truth
    log: Arc<dyn EntityLog>,

    /// Hash + version indexes, derived from the log
    indexes: RwLock<Indexes>,

    /// Serializes appends
    write_lock: Mutex<()>,

    /// Highest sequence whose index entries are in place
    committed: AtomicU64,

    /// Duplicate appends skipped since open
    duplicates_skipped: AtomicU64,

    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const LOG_FILENAME: &'static str = "entities.log";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory (file backend)
    /// 2. Replay the entity log, truncating any torn tail
    /// 3. Rebuild the hash and version indexes from the replayed records
    pub fn open(config: Config) -> Result<Self> {
        if let LogSyncStrategy::EveryNEntries { count: 0 } = config.log_sync_strategy {
            return Err(LedgerError::Config(
                "EveryNEntries sync strategy needs a count of at least 1".to_string(),
            ));
        }

        let log: Arc<dyn EntityLog> = match config.backend {
            Backend::Memory => Arc::new(MemoryLog::new()),
            Backend::File => {
                fs::create_dir_all(&config.data_dir)?;
                let path = config.data_dir.join(Self::LOG_FILENAME);
                Arc::new(FileLog::open(&path, config.log_sync_strategy)?)
            }
        };

        let store = Self::with_dependencies(log, Arc::new(SystemClock), Arc::new(UuidGenerator))?;
        tracing::info!(
            "Store opened at {} ({:?} backend, last_sequence={})",
            config.data_dir.display(),
            config.backend,
            store.last_sequence()
        );
        Ok(store)
    }

    /// Open a file-backed store in `path` with default settings
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).backend(Backend::File).build())
    }

    /// A fresh in-memory store using the system clock and random ids
    pub fn in_memory() -> Self {
        Self::assemble(
            Arc::new(MemoryLog::new()),
            Indexes::new(),
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
        )
    }

    /// Build a store over any log, with injected time and id sources.
    ///
    /// Indexes are rebuilt by replaying `log` from the first sequence.
    pub fn with_dependencies(
        log: Arc<dyn EntityLog>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let indexes = Indexes::rebuild(log.scan_up_to(log.last_sequence()))?;
        Ok(Self::assemble(log, indexes, clock, ids))
    }

    fn assemble(
        log: Arc<dyn EntityLog>,
        indexes: Indexes,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let committed = log.last_sequence();
        Self {
            log,
            indexes: RwLock::new(indexes),
            write_lock: Mutex::new(()),
            committed: AtomicU64::new(committed),
            duplicates_skipped: AtomicU64::new(0),
            clock,
            ids,
        }
    }

    /// Entity id: `metadata.id`, else a string `data.id`, else a fresh one
    fn resolve_id(&self, data: &Value, metadata: &Metadata) -> String {
        metadata
            .id()
            .or_else(|| data.get(ID_KEY).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.next_id())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Highest committed sequence (0 when empty)
    pub fn last_sequence(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// The underlying log
    pub fn log(&self) -> &Arc<dyn EntityLog> {
        &self.log
    }

    pub fn stats(&self) -> StoreStats {
        let entities = self.indexes.read().versions.entity_count() as u64;
        let last_sequence = self.last_sequence();
        StoreStats {
            records: last_sequence,
            entities,
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            last_sequence,
        }
    }

    /// Sync the log and close the store
    pub fn close(self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.log.sync()
    }
}

impl EntityStore for Store {
    /// Append steps:
    /// 1. Validate metadata (no lock, no state change on failure)
    /// 2. Hash `(entity-type, data, metadata)`
    /// 3. Under the write lock: return the original on a hash hit, otherwise
    ///    resolve id + version, write the log, then update both indexes
    fn append(&self, data: Value, metadata: Metadata) -> Result<AppendReceipt> {
        let fields = metadata.validate()?;
        let hash = content_hash(&fields.entity_type, &data, &metadata);

        let _write_guard = self.write_lock.lock();

        let existing = self.indexes.read().hashes.lookup(&hash).cloned();
        if let Some(identity) = existing {
            let original = self.log.read_at(identity.sequence)?;
            self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Duplicate append of {}/{} v{} (hash {})",
                fields.entity_type,
                identity.id,
                identity.version,
                hash
            );
            return Ok(AppendReceipt {
                id: identity.id,
                version: identity.version,
                timestamp: original.recorded_at,
                hash,
                sequence: identity.sequence,
                duplicate: true,
            });
        }

        let id = self.resolve_id(&data, &metadata);
        let version = self
            .indexes
            .read()
            .versions
            .next_version(&fields.entity_type, &id);

        let record = self.log.append_record(NewRecord {
            id,
            entity_type: fields.entity_type,
            version,
            data,
            metadata,
            hash,
            timestamp: fields.timestamp,
            recorded_at: self.clock.now_millis(),
        })?;

        self.indexes.write().apply(&record);
        self.committed.store(record.sequence, Ordering::Release);

        tracing::debug!(
            "Appended {}/{} v{} at sequence {}",
            record.entity_type,
            record.id,
            record.version,
            record.sequence
        );

        Ok(AppendReceipt {
            id: record.id.clone(),
            version: record.version,
            timestamp: record.recorded_at,
            hash: record.hash.clone(),
            sequence: record.sequence,
            duplicate: false,
        })
    }

    /// Query steps:
    /// 1. Compile the spec (fails before any index is touched)
    /// 2. Capture the snapshot sequence
    /// 3. Pick candidate sequences from the version index
    /// 4. Return a cursor that reads the log lazily
    fn query(&self, spec: &QuerySpec) -> Result<QueryCursor> {
        let plan = QueryPlan::compile(spec)?;
        let snapshot = self.last_sequence();

        let candidates = plan.candidates(&self.indexes.read().versions, snapshot);

        tracing::debug!(
            "Query on {} ({:?}, {} filter(s), {} sort key(s)) at snapshot {}: {} candidate(s)",
            plan.entity_type,
            plan.mode,
            plan.predicates.len(),
            plan.sort.len(),
            snapshot,
            candidates.len()
        );

        Ok(QueryCursor::new(Arc::clone(&self.log), plan, candidates, snapshot))
    }
}

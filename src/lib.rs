//! # AtlasLedger
//!
//! An append-only, versioned entity store with:
//! - A single ordered log as the source of truth (global sequence numbers)
//! - Content-addressed idempotent appends
//! - Full version history and time-travel ("as of") reads
//! - A declarative query interpreter with snapshot isolation
//! - In-memory and durable, crash-recoverable file backends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Store Façade                           │
//! │                 append(data, metadata)                      │
//! │                 query(spec) → cursor                        │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ (single writer)              │ (snapshot readers)
//!                ▼                              ▼
//!   ┌──────────────────────────┐      ┌──────────────────────┐
//!   │         Indexes          │◀─────│    Query Engine      │
//!   │  Hash    │   Version     │      │ spec → plan → cursor │
//!   └──────────────────────────┘      └──────────┬───────────┘
//!                ▲                               │ read_at
//!                │ replay on open                ▼
//!          ┌─────┴───────────────────────────────────────┐
//!          │                 Entity Log                  │
//!          │        MemoryLog  |  FileLog (CRC frames)   │
//!          └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use atlasledger::{EntityStore, Metadata, QuerySpec, Store};
//! use serde_json::json;
//!
//! let store = Store::in_memory();
//! let meta = Metadata::new("transaction", "bofa-parser", "2024-03-20T00:00:00Z");
//! let receipt = store.append(json!({"id": "tx-1", "amount": 42}), meta).unwrap();
//! assert_eq!(receipt.version, 1);
//!
//! let latest: Vec<_> = store
//!     .query(&QuerySpec::new("transaction").id("tx-1"))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(latest[0].data["amount"], 42);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;

pub mod record;
pub mod hash;
pub mod log;
pub mod index;
pub mod query;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LedgerError, Result};
pub use config::{Backend, Config, LogSyncStrategy};
pub use clock::{Clock, IdGenerator, ManualClock, SequentialIds, SystemClock, UuidGenerator};
pub use record::{ContentHash, EntityRecord, EntitySnapshot, Metadata, RecordIdentity};
pub use query::{QueryCursor, QuerySpec, SortDirection};
pub use store::{AppendReceipt, EntityStore, Store, StoreStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasLedger
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

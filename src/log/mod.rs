//! Entity Log Module
//!
//! The single source of truth: an ordered, immutable sequence of entity
//! records, each assigned a strictly increasing global sequence number.
//!
//! ## Responsibilities
//! - Assign sequence numbers (1, 2, 3, ...) at write time
//! - Make each append fully visible or not visible at all
//! - Point reads by sequence and bounded ascending scans
//!
//! ## Backends
//! - [`MemoryLog`]: records live in process memory
//! - [`FileLog`]: records are framed into an append-only file and replayed on open
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │ Frame 1                                           │
//! │ ┌──────────┬─────────┬─────────┬────────────────┐ │
//! │ │ Seq (8)  │ CRC (4) │ Len (4) │ Payload        │ │
//! │ └──────────┴─────────┴─────────┴────────────────┘ │
//! ├───────────────────────────────────────────────────┤
//! │ Frame 2                                           │
//! │ ...                                               │
//! └───────────────────────────────────────────────────┘
//! ```
//! The payload is a bincode-encoded [`StoredRecord`].

mod entry;
mod file;
mod memory;
mod reader;
mod recovery;
mod writer;

pub use entry::{LogEntry, StoredRecord, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use file::FileLog;
pub use memory::MemoryLog;
pub use reader::LogReader;
pub use recovery::{LogRecovery, RecoveryResult};
pub use writer::{LogSink, LogWriter};

use crate::error::Result;
use crate::record::{EntitySnapshot, NewRecord};

/// Lazy, single-pass scan in ascending sequence order
pub type LogScan = Box<dyn Iterator<Item = Result<EntitySnapshot>> + Send>;

/// Storage interface every backend implements.
///
/// Sequence numbers start at 1; 0 means "nothing written yet".
pub trait EntityLog: Send + Sync {
    /// Assign the next sequence number and persist the record
    fn append_record(&self, record: NewRecord) -> Result<EntitySnapshot>;

    /// Fetch the record written at `sequence`
    fn read_at(&self, sequence: u64) -> Result<EntitySnapshot>;

    /// Records with `sequence <= max_sequence`, ascending.
    /// Each call returns a fresh scan.
    fn scan_up_to(&self, max_sequence: u64) -> LogScan;

    /// Highest sequence written so far
    fn last_sequence(&self) -> u64;

    /// Flush anything buffered to durable storage
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

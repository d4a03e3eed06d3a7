//! Index Module
//!
//! Derived lookup structures over the entity log.
//!
//! ## Responsibilities
//! - [`HashIndex`]: content hash → record identity (idempotent appends)
//! - [`VersionIndex`]: (entity type, id) → ordered versions (latest / history / as-of)
//!
//! Both indexes hold nothing the log cannot regenerate: [`Indexes::rebuild`]
//! replays a log scan from sequence 1 and produces the same state the live
//! writer built incrementally.

mod hash_index;
mod version_index;

pub use hash_index::HashIndex;
pub use version_index::{VersionEntry, VersionIndex};

use crate::error::{LedgerError, Result};
use crate::log::LogScan;
use crate::record::EntityRecord;

/// Both indexes, always updated together
#[derive(Debug, Default)]
pub struct Indexes {
    pub hashes: HashIndex,
    pub versions: VersionIndex,
}

impl Indexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one freshly sequenced record into both indexes
    pub fn apply(&mut self, record: &EntityRecord) {
        self.versions.record(
            &record.entity_type,
            &record.id,
            VersionEntry {
                version: record.version,
                sequence: record.sequence,
                timestamp: record.timestamp,
            },
        );
        self.hashes.record(record.hash.clone(), record.identity());
    }

    /// Rebuild both indexes by replaying the log
    pub fn rebuild(scan: LogScan) -> Result<Self> {
        let mut indexes = Self::new();
        for record in scan {
            let record = record?;
            let expected = indexes.versions.next_version(&record.entity_type, &record.id);
            if record.version != expected {
                return Err(LedgerError::LogCorruption(format!(
                    "entity {}/{} has version {} at sequence {}, expected {}",
                    record.entity_type, record.id, record.version, record.sequence, expected
                )));
            }
            indexes.apply(&record);
        }
        Ok(indexes)
    }
}

//! In-memory entity log
//!
//! Also provides [`RecordSegment`], the append-only record vector that the
//! file backend keeps as its read cache.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{LedgerError, Result};
use crate::record::{EntityRecord, EntitySnapshot, NewRecord};

use super::{EntityLog, LogScan};

/// Append-only vector of records; the record with sequence `n` lives at index `n - 1`
#[derive(Clone, Default)]
pub(crate) struct RecordSegment {
    records: Arc<RwLock<Vec<EntitySnapshot>>>,
}

impl RecordSegment {
    pub(crate) fn from_records(records: Vec<EntityRecord>) -> Self {
        let records = records.into_iter().map(Arc::new).collect();
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Sequence the next push will receive
    pub(crate) fn next_sequence(&self) -> u64 {
        self.records.read().len() as u64 + 1
    }

    /// Publish a record. Callers hold the log's write path exclusively.
    pub(crate) fn push(&self, record: EntityRecord) -> EntitySnapshot {
        let snapshot = Arc::new(record);
        self.records.write().push(Arc::clone(&snapshot));
        snapshot
    }

    pub(crate) fn get(&self, sequence: u64) -> Result<EntitySnapshot> {
        if sequence == 0 {
            return Err(LedgerError::SequenceNotFound(sequence));
        }
        self.records
            .read()
            .get((sequence - 1) as usize)
            .cloned()
            .ok_or(LedgerError::SequenceNotFound(sequence))
    }

    pub(crate) fn len(&self) -> u64 {
        self.records.read().len() as u64
    }

    pub(crate) fn scan(&self, max_sequence: u64) -> LogScan {
        Box::new(SegmentScan {
            records: Arc::clone(&self.records),
            next: 1,
            max_sequence,
        })
    }
}

/// Cursor over a segment.
///
/// Takes the read lock for one record at a time, so a slow consumer never
/// holds up the writer.
struct SegmentScan {
    records: Arc<RwLock<Vec<EntitySnapshot>>>,
    next: u64,
    max_sequence: u64,
}

impl Iterator for SegmentScan {
    type Item = Result<EntitySnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.max_sequence {
            return None;
        }
        let record = self.records.read().get((self.next - 1) as usize).cloned()?;
        self.next += 1;
        Some(Ok(record))
    }
}

/// Entity log held entirely in memory
#[derive(Default)]
pub struct MemoryLog {
    segment: RecordSegment,
    write_lock: parking_lot::Mutex<()>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityLog for MemoryLog {
    fn append_record(&self, record: NewRecord) -> Result<EntitySnapshot> {
        let _write_guard = self.write_lock.lock();
        let sequence = self.segment.next_sequence();
        Ok(self.segment.push(record.into_record(sequence)))
    }

    fn read_at(&self, sequence: u64) -> Result<EntitySnapshot> {
        self.segment.get(sequence)
    }

    fn scan_up_to(&self, max_sequence: u64) -> LogScan {
        self.segment.scan(max_sequence)
    }

    fn last_sequence(&self) -> u64 {
        self.segment.len()
    }
}

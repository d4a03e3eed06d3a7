//! File-backed entity log
//!
//! Frames every record into a single append-only file. Reads are served from
//! an in-memory copy rebuilt by replaying the file on open.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::LogSyncStrategy;
use crate::error::Result;
use crate::record::{EntityRecord, EntitySnapshot, NewRecord};

use super::memory::RecordSegment;
use super::{EntityLog, LogEntry, LogRecovery, LogScan, LogSink, LogWriter, RecoveryResult};

/// Durable entity log
pub struct FileLog {
    path: PathBuf,

    /// Exclusive write path; also serializes sequence assignment
    writer: Mutex<LogWriter>,

    /// Every durable record, in sequence order
    segment: RecordSegment,

    /// What the replay on open found
    recovery: RecoveryResult,
}

impl FileLog {
    /// Open or create the log at `path`
    ///
    /// On open:
    /// 1. Replay every valid frame (truncating a torn or corrupt tail)
    /// 2. Load the recovered records into memory
    /// 3. Position the writer after the last valid frame
    pub fn open(path: &Path, sync_strategy: LogSyncStrategy) -> Result<Self> {
        let replayed = Self::replay(path)?;
        let writer = LogWriter::open(path, sync_strategy)?;
        Ok(Self::assemble(path, writer, replayed))
    }

    /// Like [`open`](Self::open), but frames go to `sink` instead of a file
    /// handle opened here. `sink` must append to the file at `path`.
    pub fn open_with_sink(
        path: &Path,
        sync_strategy: LogSyncStrategy,
        sink: Box<dyn LogSink>,
    ) -> Result<Self> {
        let replayed = Self::replay(path)?;
        let writer = LogWriter::with_sink(path, sink, replayed.1.valid_len, sync_strategy);
        Ok(Self::assemble(path, writer, replayed))
    }

    fn replay(path: &Path) -> Result<(Vec<EntityRecord>, RecoveryResult)> {
        let (records, recovery) = LogRecovery::recover(path)?;

        if recovery.records_recovered > 0 || recovery.was_truncated {
            tracing::info!(
                "Entity log replay: {} records recovered, last_sequence={}, truncated={}",
                recovery.records_recovered,
                recovery.last_sequence,
                recovery.was_truncated
            );
        }

        Ok((records, recovery))
    }

    fn assemble(
        path: &Path,
        writer: LogWriter,
        (records, recovery): (Vec<EntityRecord>, RecoveryResult),
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
            segment: RecordSegment::from_records(records),
            recovery,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay statistics from open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }
}

impl EntityLog for FileLog {
    fn append_record(&self, record: NewRecord) -> Result<EntitySnapshot> {
        let mut writer = self.writer.lock();

        let sequence = self.segment.next_sequence();
        let record = record.into_record(sequence);

        // Durable first; only then visible to readers. A failed write leaves
        // nothing behind, so the sequence is free for the next attempt.
        writer.append(&LogEntry::new(&record)?)?;
        Ok(self.segment.push(record))
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

    fn sync(&self) -> Result<()> {
        self.writer.lock().sync()
    }
}

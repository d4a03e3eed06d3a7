//! Tests for the file-backed entity log
//!
//! These tests verify:
//! - Sequence assignment starts at 1 and is contiguous
//! - Point reads and bounded scans
//! - Records survive reopening
//! - Sync strategies
//! - Failed writes and syncs leave the file and sequence untouched

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atlasledger::config::LogSyncStrategy;
use atlasledger::log::{EntityLog, FileLog, LogReader, LogSink};
use atlasledger::record::{ContentHash, Metadata, NewRecord};
use atlasledger::{EntityStore, LedgerError, ManualClock, SequentialIds, Store};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("entities.log");
    (temp_dir, path)
}

fn new_record(id: &str, version: u64, amount: i64) -> NewRecord {
    NewRecord {
        id: id.to_string(),
        entity_type: "transaction".to_string(),
        version,
        data: json!({"amount": amount}),
        metadata: Metadata::new("transaction", "test", amount),
        hash: ContentHash::new(format!("{}-{}", id, version)),
        timestamp: amount,
        recorded_at: 0,
    }
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_sequences_start_at_one() {
    let (_temp, path) = setup_temp_log();
    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();

    assert_eq!(log.last_sequence(), 0);

    let first = log.append_record(new_record("a", 1, 10)).unwrap();
    let second = log.append_record(new_record("b", 1, 20)).unwrap();
    let third = log.append_record(new_record("a", 2, 30)).unwrap();

    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(third.sequence, 3);
    assert_eq!(log.last_sequence(), 3);
}

#[test]
fn test_read_at() {
    let (_temp, path) = setup_temp_log();
    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();

    log.append_record(new_record("a", 1, 10)).unwrap();
    log.append_record(new_record("b", 1, 20)).unwrap();

    let record = log.read_at(2).unwrap();
    assert_eq!(record.id, "b");
    assert_eq!(record.data["amount"], 20);
}

#[test]
fn test_read_at_unknown_sequence() {
    let (_temp, path) = setup_temp_log();
    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    log.append_record(new_record("a", 1, 10)).unwrap();

    assert!(matches!(log.read_at(0), Err(LedgerError::SequenceNotFound(0))));
    assert!(matches!(log.read_at(2), Err(LedgerError::SequenceNotFound(2))));
}

#[test]
fn test_scan_up_to_is_bounded_and_ordered() {
    let (_temp, path) = setup_temp_log();
    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    for i in 0..5 {
        log.append_record(new_record(&format!("e{}", i), 1, i)).unwrap();
    }

    let sequences: Vec<u64> = log
        .scan_up_to(3)
        .map(|r| r.unwrap().sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    // A fresh call yields a fresh scan
    assert_eq!(log.scan_up_to(5).count(), 5);
    assert_eq!(log.scan_up_to(0).count(), 0);
}

#[test]
fn test_scan_ignores_later_appends() {
    let (_temp, path) = setup_temp_log();
    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    log.append_record(new_record("a", 1, 1)).unwrap();
    log.append_record(new_record("b", 1, 2)).unwrap();

    let mut scan = log.scan_up_to(log.last_sequence());
    assert_eq!(scan.next().unwrap().unwrap().sequence, 1);

    log.append_record(new_record("c", 1, 3)).unwrap();

    assert_eq!(scan.next().unwrap().unwrap().sequence, 2);
    assert!(scan.next().is_none());
}

// =============================================================================
// Durability Tests
// =============================================================================

#[test]
fn test_records_survive_reopen() {
    let (_temp, path) = setup_temp_log();

    {
        let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
        log.append_record(new_record("a", 1, 10)).unwrap();
        log.append_record(new_record("a", 2, 20)).unwrap();
    }

    let log = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    assert_eq!(log.last_sequence(), 2);
    assert_eq!(log.recovery().records_recovered, 2);
    assert_eq!(log.read_at(2).unwrap().version, 2);

    // New appends continue the sequence
    let next = log.append_record(new_record("a", 3, 30)).unwrap();
    assert_eq!(next.sequence, 3);
}

#[test]
fn test_every_n_entries_still_readable_after_sync() {
    let (_temp, path) = setup_temp_log();

    {
        let log = FileLog::open(&path, LogSyncStrategy::EveryNEntries { count: 10 }).unwrap();
        for i in 0..3 {
            log.append_record(new_record("a", i + 1, i as i64)).unwrap();
        }
        log.sync().unwrap();
    }

    let entries: Vec<_> = LogReader::open(&path)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].sequence, 3);
}

// =============================================================================
// Failed Write Tests
// =============================================================================

/// Switches that make the sink below fail
#[derive(Clone, Default)]
struct Faults {
    write: Arc<AtomicBool>,
    sync: Arc<AtomicBool>,
    truncate: Arc<AtomicBool>,
}

impl Faults {
    fn clear(&self) {
        self.write.store(false, Ordering::SeqCst);
        self.sync.store(false, Ordering::SeqCst);
        self.truncate.store(false, Ordering::SeqCst);
    }
}

/// Appends to a real file, failing on demand
struct FaultySink {
    file: File,
    faults: Faults,
}

impl Write for FaultySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.faults.write.load(Ordering::SeqCst) {
            // Half the frame reaches the file before the device gives up
            self.file.write_all(&buf[..buf.len() / 2])?;
            return Err(io::Error::new(io::ErrorKind::Other, "write failed"));
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl LogSink for FaultySink {
    fn sync_data(&mut self) -> io::Result<()> {
        if self.faults.sync.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
        }
        self.file.sync_data()
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        if self.faults.truncate.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "truncate failed"));
        }
        self.file.set_len(len)
    }
}

fn open_faulty(path: &Path) -> (FileLog, Faults) {
    let faults = Faults::default();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    let sink = FaultySink {
        file,
        faults: faults.clone(),
    };
    let log = FileLog::open_with_sink(path, LogSyncStrategy::EveryWrite, Box::new(sink)).unwrap();
    (log, faults)
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

#[test]
fn test_failed_sync_leaves_nothing_behind() {
    let (_temp, path) = setup_temp_log();
    let (log, faults) = open_faulty(&path);

    log.append_record(new_record("a", 1, 10)).unwrap();
    let len_before = file_len(&path);

    faults.sync.store(true, Ordering::SeqCst);
    let result = log.append_record(new_record("rejected", 1, 20));
    assert!(matches!(result, Err(LedgerError::StorageUnavailable(_))));

    assert_eq!(file_len(&path), len_before);
    assert_eq!(log.last_sequence(), 1);
    assert!(matches!(log.read_at(2), Err(LedgerError::SequenceNotFound(2))));

    faults.clear();
    let retried = log.append_record(new_record("b", 1, 30)).unwrap();
    let after = log.append_record(new_record("c", 1, 40)).unwrap();
    assert_eq!(retried.sequence, 2);
    assert_eq!(after.sequence, 3);
    drop(log);

    // Every acknowledged record comes back and the rejected one does not
    let reopened = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    assert_eq!(reopened.last_sequence(), 3);
    assert!(!reopened.recovery().was_truncated);
    let ids: Vec<String> = reopened
        .scan_up_to(3)
        .map(|r| r.unwrap().id.clone())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_torn_write_is_rolled_back() {
    let (_temp, path) = setup_temp_log();
    let (log, faults) = open_faulty(&path);

    log.append_record(new_record("a", 1, 10)).unwrap();
    let len_before = file_len(&path);

    faults.write.store(true, Ordering::SeqCst);
    assert!(log.append_record(new_record("rejected", 1, 20)).is_err());
    assert_eq!(file_len(&path), len_before);
    assert_eq!(log.last_sequence(), 1);

    faults.clear();
    assert_eq!(log.append_record(new_record("b", 1, 30)).unwrap().sequence, 2);
    drop(log);

    let reopened = FileLog::open(&path, LogSyncStrategy::EveryWrite).unwrap();
    assert_eq!(reopened.last_sequence(), 2);
    assert_eq!(reopened.recovery().bytes_discarded, 0);
    assert_eq!(reopened.read_at(2).unwrap().id, "b");
}

#[test]
fn test_failed_rollback_refuses_further_appends() {
    let (_temp, path) = setup_temp_log();
    let (log, faults) = open_faulty(&path);

    log.append_record(new_record("a", 1, 10)).unwrap();

    faults.sync.store(true, Ordering::SeqCst);
    faults.truncate.store(true, Ordering::SeqCst);
    assert!(log.append_record(new_record("rejected", 1, 20)).is_err());

    // The file may still end in the rejected frame; reusing its sequence
    // would hide later records behind it
    faults.clear();
    let result = log.append_record(new_record("b", 1, 30));
    assert!(matches!(result, Err(LedgerError::StorageUnavailable(_))));
    assert_eq!(log.last_sequence(), 1);
}

#[test]
fn test_store_append_after_failed_sync() {
    let (_temp, path) = setup_temp_log();
    let (log, faults) = open_faulty(&path);
    let store = Store::with_dependencies(
        Arc::new(log),
        Arc::new(ManualClock::new(0)),
        Arc::new(SequentialIds::new("gen")),
    )
    .unwrap();

    let meta = || Metadata::new("transaction", "test", 1).with_id("tx-1");
    store.append(json!({"amount": 1}), meta()).unwrap();

    faults.sync.store(true, Ordering::SeqCst);
    assert!(store.append(json!({"amount": 2}), meta()).is_err());
    assert_eq!(store.last_sequence(), 1);
    assert_eq!(store.stats().entities, 1);

    // Nothing was indexed, so the same content goes through as version 2
    faults.clear();
    let receipt = store.append(json!({"amount": 2}), meta()).unwrap();
    assert!(!receipt.duplicate);
    assert_eq!(receipt.sequence, 2);
    assert_eq!(receipt.version, 2);
}

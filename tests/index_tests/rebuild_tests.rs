//! Tests for rebuilding indexes by replaying the log

use std::sync::Arc;

use atlasledger::index::Indexes;
use atlasledger::log::{EntityLog, MemoryLog};
use atlasledger::record::{ContentHash, Metadata, NewRecord};
use atlasledger::{EntityStore, LedgerError, ManualClock, SequentialIds, Store};
use serde_json::json;

fn new_record(id: &str, version: u64, ts: i64) -> NewRecord {
    NewRecord {
        id: id.to_string(),
        entity_type: "transaction".to_string(),
        version,
        data: json!({"ts": ts}),
        metadata: Metadata::new("transaction", "test", ts),
        hash: ContentHash::new(format!("{}-{}", id, version)),
        timestamp: ts,
        recorded_at: 0,
    }
}

#[test]
fn test_rebuild_matches_live_indexes() {
    let log = Arc::new(MemoryLog::new());
    let store = Store::with_dependencies(
        log.clone(),
        Arc::new(ManualClock::new(0)),
        Arc::new(SequentialIds::new("gen")),
    )
    .unwrap();

    for (id, amount) in [("a", 1), ("b", 2), ("a", 3), ("a", 4), ("c", 5)] {
        let meta = Metadata::new("transaction", "test", amount);
        store.append(json!({"id": id, "amount": amount}), meta).unwrap();
    }

    let rebuilt = Indexes::rebuild(log.scan_up_to(log.last_sequence())).unwrap();

    assert_eq!(rebuilt.versions.next_version("transaction", "a"), 4);
    assert_eq!(rebuilt.versions.next_version("transaction", "b"), 2);
    assert_eq!(rebuilt.versions.entity_count(), 3);
    assert_eq!(rebuilt.hashes.len(), 5);

    let latest_a = rebuilt.versions.latest("transaction", "a", u64::MAX).unwrap();
    assert_eq!(latest_a.sequence, 4);
}

#[test]
fn test_rebuild_rejects_version_gap() {
    let log = MemoryLog::new();
    log.append_record(new_record("a", 1, 10)).unwrap();
    log.append_record(new_record("a", 3, 20)).unwrap();

    let result = Indexes::rebuild(log.scan_up_to(2));
    assert!(matches!(result, Err(LedgerError::LogCorruption(_))));
}

#[test]
fn test_store_over_existing_log_continues_versions() {
    let log = Arc::new(MemoryLog::new());
    log.append_record(new_record("a", 1, 10)).unwrap();
    log.append_record(new_record("a", 2, 20)).unwrap();

    let store = Store::with_dependencies(
        log,
        Arc::new(ManualClock::new(0)),
        Arc::new(SequentialIds::new("gen")),
    )
    .unwrap();

    let meta = Metadata::new("transaction", "test", 30).with_id("a");
    let receipt = store.append(json!({"ts": 30}), meta).unwrap();

    assert_eq!(receipt.version, 3);
    assert_eq!(receipt.sequence, 3);
}

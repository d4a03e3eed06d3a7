//! Tests for the in-memory entity log

use std::sync::Arc;
use std::thread;

use atlasledger::log::{EntityLog, MemoryLog};
use atlasledger::record::{ContentHash, Metadata, NewRecord};
use serde_json::json;

fn new_record(id: &str, n: i64) -> NewRecord {
    NewRecord {
        id: id.to_string(),
        entity_type: "event".to_string(),
        version: 1,
        data: json!({"n": n}),
        metadata: Metadata::new("event", "test", n),
        hash: ContentHash::new(format!("{}-{}", id, n)),
        timestamp: n,
        recorded_at: 0,
    }
}

#[test]
fn test_memory_log_append_and_read() {
    let log = MemoryLog::new();

    let record = log.append_record(new_record("a", 1)).unwrap();

    assert_eq!(record.sequence, 1);
    assert_eq!(log.read_at(1).unwrap(), record);
    assert_eq!(log.last_sequence(), 1);
}

#[test]
fn test_abandoned_scan_has_no_effect() {
    let log = MemoryLog::new();
    for i in 0..4 {
        log.append_record(new_record("a", i)).unwrap();
    }

    {
        let mut scan = log.scan_up_to(4);
        scan.next();
        // dropped half way
    }

    assert_eq!(log.last_sequence(), 4);
    assert_eq!(log.scan_up_to(4).count(), 4);
}

#[test]
fn test_concurrent_appends_get_unique_sequences() {
    let log = Arc::new(MemoryLog::new());

    let mut handles = vec![];
    for t in 0..4 {
        let log = Arc::clone(&log);
        handles.push(thread::spawn(move || {
            (0..50)
                .map(|i| {
                    log.append_record(new_record(&format!("t{}", t), i))
                        .unwrap()
                        .sequence
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();

    assert_eq!(all, (1..=200).collect::<Vec<_>>());
}

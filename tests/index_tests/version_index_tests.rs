//! Tests for the version index
//!
//! These tests verify:
//! - next_version numbering
//! - latest / versions bounded by a snapshot sequence
//! - as-of resolution, including ties and out-of-order timestamps

use atlasledger::index::{VersionEntry, VersionIndex};

// =============================================================================
// Helper Functions
// =============================================================================

fn entry(version: u64, sequence: u64, timestamp: i64) -> VersionEntry {
    VersionEntry {
        version,
        sequence,
        timestamp,
    }
}

/// tx-1 at t=100, 200, 300 committed at sequences 1, 3, 5
fn three_versions() -> VersionIndex {
    let mut index = VersionIndex::new();
    index.record("transaction", "tx-1", entry(1, 1, 100));
    index.record("transaction", "tx-1", entry(2, 3, 200));
    index.record("transaction", "tx-1", entry(3, 5, 300));
    index
}

// =============================================================================
// Numbering Tests
// =============================================================================

#[test]
fn test_next_version_for_unseen_id() {
    let index = VersionIndex::new();
    assert_eq!(index.next_version("transaction", "tx-1"), 1);
}

#[test]
fn test_next_version_increments() {
    let index = three_versions();
    assert_eq!(index.next_version("transaction", "tx-1"), 4);
}

#[test]
fn test_entity_types_partition_ids() {
    let mut index = three_versions();
    index.record("event", "tx-1", entry(1, 6, 100));

    assert_eq!(index.next_version("event", "tx-1"), 2);
    assert_eq!(index.next_version("transaction", "tx-1"), 4);
    assert_eq!(index.entity_count(), 2);
}

// =============================================================================
// Latest / History Tests
// =============================================================================

#[test]
fn test_latest() {
    let index = three_versions();

    assert_eq!(index.latest("transaction", "tx-1", u64::MAX), Some(entry(3, 5, 300)));
    assert_eq!(index.latest("transaction", "missing", u64::MAX), None);
}

#[test]
fn test_latest_respects_snapshot() {
    let index = three_versions();

    assert_eq!(index.latest("transaction", "tx-1", 4).map(|e| e.version), Some(2));
    assert_eq!(index.latest("transaction", "tx-1", 0), None);
}

#[test]
fn test_versions_ascending_and_bounded() {
    let index = three_versions();

    let all: Vec<u64> = index
        .versions("transaction", "tx-1", u64::MAX)
        .iter()
        .map(|e| e.version)
        .collect();
    assert_eq!(all, vec![1, 2, 3]);

    assert_eq!(index.versions("transaction", "tx-1", 3).len(), 2);
}

// =============================================================================
// As-Of Tests
// =============================================================================

#[test]
fn test_as_of_picks_version_at_time() {
    let index = three_versions();

    let at = |t| index.as_of("transaction", "tx-1", t, u64::MAX).map(|e| e.version);
    assert_eq!(at(99), None);
    assert_eq!(at(100), Some(1));
    assert_eq!(at(250), Some(2));
    assert_eq!(at(200), Some(2));
    assert_eq!(at(10_000), Some(3));
}

#[test]
fn test_as_of_tie_goes_to_later_write() {
    let mut index = VersionIndex::new();
    index.record("transaction", "tx-1", entry(1, 1, 100));
    index.record("transaction", "tx-1", entry(2, 2, 100));

    let found = index.as_of("transaction", "tx-1", 100, u64::MAX).unwrap();
    assert_eq!(found.version, 2);
}

#[test]
fn test_as_of_with_out_of_order_timestamps() {
    // A late-arriving correction stamped earlier than the version before it
    let mut index = VersionIndex::new();
    index.record("transaction", "tx-1", entry(1, 1, 100));
    index.record("transaction", "tx-1", entry(2, 2, 300));
    index.record("transaction", "tx-1", entry(3, 3, 200));

    let at = |t| index.as_of("transaction", "tx-1", t, u64::MAX).map(|e| e.version);
    assert_eq!(at(250), Some(3));
    assert_eq!(at(300), Some(3));
    assert_eq!(at(150), Some(1));
}

#[test]
fn test_as_of_respects_snapshot() {
    let index = three_versions();

    let found = index.as_of("transaction", "tx-1", 10_000, 3).unwrap();
    assert_eq!(found.version, 2);
}

#[test]
fn test_ids_listed_in_order() {
    let mut index = VersionIndex::new();
    index.record("bank", "wise", entry(1, 1, 0));
    index.record("bank", "bofa", entry(1, 2, 0));
    index.record("transaction", "tx-1", entry(1, 3, 0));

    let ids: Vec<&str> = index.ids("bank").collect();
    assert_eq!(ids, vec!["bofa", "wise"]);
    assert_eq!(index.ids("merchant").count(), 0);
}

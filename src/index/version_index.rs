//! Version Index
//!
//! Per-(entity type, id) version bookkeeping.
//!
//! Every read takes a `max_sequence` bound so queries see the index exactly as
//! it stood at their snapshot; pass `u64::MAX` for "everything".

use std::collections::{BTreeMap, HashMap};

/// One version of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionEntry {
    pub version: u64,

    /// Log position of the version's record
    pub sequence: u64,

    /// Caller-supplied logical time, in milliseconds
    pub timestamp: i64,
}

/// entity type → id → versions in ascending sequence (and version) order
#[derive(Debug, Default)]
pub struct VersionIndex {
    types: HashMap<String, BTreeMap<String, Vec<VersionEntry>>>,
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 if the id is unseen, otherwise the previous maximum + 1
    pub fn next_version(&self, entity_type: &str, id: &str) -> u64 {
        self.entries(entity_type, id)
            .last()
            .map_or(1, |entry| entry.version + 1)
    }

    /// Append a version. Entries arrive in sequence order from the single writer.
    pub fn record(&mut self, entity_type: &str, id: &str, entry: VersionEntry) {
        let versions = self
            .types
            .entry(entity_type.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();

        debug_assert!(versions.last().map_or(1, |e| e.version + 1) == entry.version);
        debug_assert!(versions.last().map_or(true, |e| e.sequence < entry.sequence));
        versions.push(entry);
    }

    /// Versions committed at or before `max_sequence`, ascending
    pub fn versions(&self, entity_type: &str, id: &str, max_sequence: u64) -> &[VersionEntry] {
        let all = self.entries(entity_type, id);
        let visible = all.partition_point(|e| e.sequence <= max_sequence);
        &all[..visible]
    }

    /// The version with the greatest sequence at or before `max_sequence`
    pub fn latest(&self, entity_type: &str, id: &str, max_sequence: u64) -> Option<VersionEntry> {
        self.versions(entity_type, id, max_sequence).last().copied()
    }

    /// The version with the greatest sequence whose timestamp is `<= timestamp`.
    ///
    /// Timestamps are caller-supplied and need not grow with sequence, so
    /// this walks back from the newest visible version; ties on timestamp go
    /// to the later write.
    pub fn as_of(
        &self,
        entity_type: &str,
        id: &str,
        timestamp: i64,
        max_sequence: u64,
    ) -> Option<VersionEntry> {
        self.versions(entity_type, id, max_sequence)
            .iter()
            .rev()
            .find(|e| e.timestamp <= timestamp)
            .copied()
    }

    /// Ids of one entity type, in id order
    pub fn ids<'a>(&'a self, entity_type: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.types
            .get(entity_type)
            .into_iter()
            .flat_map(|ids| ids.keys().map(String::as_str))
    }

    /// Number of distinct (entity type, id) pairs
    pub fn entity_count(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    fn entries(&self, entity_type: &str, id: &str) -> &[VersionEntry] {
        self.types
            .get(entity_type)
            .and_then(|ids| ids.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

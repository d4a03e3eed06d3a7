//! Hash Index
//!
//! Maps a content digest to the record that first carried it.

use std::collections::HashMap;

use crate::record::{ContentHash, RecordIdentity};

#[derive(Debug, Default)]
pub struct HashIndex {
    entries: HashMap<ContentHash, RecordIdentity>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, hash: &ContentHash) -> Option<&RecordIdentity> {
        self.entries.get(hash)
    }

    /// Remember `hash`. The first identity recorded for a hash is kept.
    pub fn record(&mut self, hash: ContentHash, identity: RecordIdentity) {
        self.entries.entry(hash).or_insert(identity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Query Cursor
//!
//! Lazily executes a plan against the log. Candidates are fixed when the
//! cursor is created, so later appends never show up; records are read, filtered
//! and paginated as the caller pulls. Dropping a cursor part way has no effect
//! on the store.

use std::sync::Arc;

use crate::error::Result;
use crate::log::EntityLog;
use crate::record::{EntityRecord, EntitySnapshot};

use super::QueryPlan;

/// Finite, single-pass sequence of query results
pub struct QueryCursor {
    log: Arc<dyn EntityLog>,
    plan: QueryPlan,
    candidates: std::vec::IntoIter<u64>,
    snapshot_sequence: u64,
    state: CursorState,
}

enum CursorState {
    /// No sort keys: filter and paginate one record at a time
    Streaming { skipped: usize, emitted: usize },

    /// Sort keys present: everything is read on the first pull
    Unsorted,

    /// Sorted and windowed results waiting to be handed out
    Sorted(std::vec::IntoIter<EntitySnapshot>),

    Done,
}

impl QueryCursor {
    pub(crate) fn new(
        log: Arc<dyn EntityLog>,
        plan: QueryPlan,
        candidates: Vec<u64>,
        snapshot_sequence: u64,
    ) -> Self {
        let state = if plan.sort.is_empty() {
            CursorState::Streaming {
                skipped: 0,
                emitted: 0,
            }
        } else {
            CursorState::Unsorted
        };

        Self {
            log,
            plan,
            candidates: candidates.into_iter(),
            snapshot_sequence,
            state,
        }
    }

    /// Last sequence visible to this cursor
    pub fn snapshot_sequence(&self) -> u64 {
        self.snapshot_sequence
    }

    /// The compiled plan being executed
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    fn matches(&self, record: &EntityRecord) -> bool {
        self.plan
            .predicates
            .iter()
            .all(|(field, predicate)| predicate.matches(field.resolve(record).as_deref()))
    }

    /// Next candidate that passes every filter
    fn next_match(&mut self) -> Option<Result<EntitySnapshot>> {
        while let Some(sequence) = self.candidates.next() {
            match self.log.read_at(sequence) {
                Ok(record) if self.matches(&record) => return Some(Ok(record)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    /// Read every match, sort it and cut the window
    fn materialize(&mut self) -> Result<Vec<EntitySnapshot>> {
        let mut rows = Vec::new();
        while let Some(record) = self.next_match() {
            rows.push(record?);
        }

        // Stable: ties keep ascending sequence order
        let sort = &self.plan.sort;
        rows.sort_by(|a, b| {
            sort.iter()
                .map(|key| key.compare(a, b))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let limit = self.plan.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(self.plan.offset).take(limit).collect())
    }
}

impl Iterator for QueryCursor {
    type Item = Result<EntitySnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                CursorState::Done => return None,

                CursorState::Unsorted => match self.materialize() {
                    Ok(rows) => self.state = CursorState::Sorted(rows.into_iter()),
                    Err(e) => {
                        self.state = CursorState::Done;
                        return Some(Err(e));
                    }
                },

                CursorState::Sorted(rows) => {
                    let next = rows.next();
                    if next.is_none() {
                        self.state = CursorState::Done;
                    }
                    return next.map(Ok);
                }

                CursorState::Streaming { skipped, emitted } => {
                    if self.plan.limit.map_or(false, |limit| *emitted >= limit) {
                        self.state = CursorState::Done;
                        return None;
                    }
                    let (mut skipped_now, emitted_now) = (*skipped, *emitted);

                    let item = loop {
                        match self.next_match() {
                            Some(Ok(_)) if skipped_now < self.plan.offset => skipped_now += 1,
                            other => break other,
                        }
                    };

                    match item {
                        Some(Ok(record)) => {
                            self.state = CursorState::Streaming {
                                skipped: skipped_now,
                                emitted: emitted_now + 1,
                            };
                            return Some(Ok(record));
                        }
                        Some(Err(e)) => {
                            self.state = CursorState::Done;
                            return Some(Err(e));
                        }
                        None => {
                            self.state = CursorState::Done;
                            return None;
                        }
                    }
                }
            }
        }
    }
}

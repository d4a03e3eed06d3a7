//! Query planning
//!
//! Compiles a [`QuerySpec`] into a typed [`QueryPlan`] and resolves the plan's
//! candidate records from the version index. Nothing here touches the log.

use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::index::{VersionEntry, VersionIndex};
use crate::record::parse_timestamp;

use super::{Field, Predicate, QuerySpec, SortDirection, SortKey};

/// Which versions of each selected entity to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMode {
    /// The newest version
    Latest,
    /// Every version, ascending
    All,
    /// The newest version whose logical timestamp is `<= t`
    AsOf(i64),
    /// Every version whose logical timestamp is `<= t`, ascending
    AllAsOf(i64),
}

/// A compiled query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub entity_type: String,

    /// `Some` for a single-entity lookup; `None` scans every id of the type
    pub id: Option<String>,

    pub mode: VersionMode,

    /// All must hold (logical AND)
    pub predicates: Vec<(Field, Predicate)>,

    /// Empty means ascending sequence order
    pub sort: Vec<SortKey>,

    pub offset: usize,
    pub limit: Option<usize>,
}

impl QueryPlan {
    /// Validate a spec and turn it into a plan.
    ///
    /// Fails with `InvalidQuerySpec` before any index is consulted.
    pub fn compile(spec: &QuerySpec) -> Result<Self> {
        let entity_type = spec
            .entity_type
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LedgerError::InvalidQuerySpec("missing `entity-type`".to_string()))?;

        let all = match spec.versions.as_deref() {
            None | Some("latest") => false,
            Some("all") => true,
            Some(other) => {
                return Err(LedgerError::InvalidQuerySpec(format!(
                    "`versions` must be `all` or `latest`, got `{}`",
                    other
                )))
            }
        };

        let as_of = spec
            .as_of
            .as_ref()
            .map(|raw| {
                parse_timestamp(raw).ok_or_else(|| {
                    LedgerError::InvalidQuerySpec(format!("unreadable `as-of`: {}", raw))
                })
            })
            .transpose()?;

        let mode = match (all, as_of) {
            (false, None) => VersionMode::Latest,
            (true, None) => VersionMode::All,
            (false, Some(t)) => VersionMode::AsOf(t),
            (true, Some(t)) => VersionMode::AllAsOf(t),
        };

        // Filters are validated even when an id makes them moot
        let mut predicates = Vec::with_capacity(spec.filters.len());
        for (name, raw) in &spec.filters {
            predicates.push((Field::parse(name)?, Predicate::parse(name, raw)?));
        }
        if spec.id.is_some() && !predicates.is_empty() {
            tracing::debug!("Query names an id; ignoring {} filter(s)", predicates.len());
            predicates.clear();
        }

        let sort = spec
            .order_by
            .iter()
            .map(parse_sort_key)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entity_type,
            id: spec.id.clone(),
            mode,
            predicates,
            sort,
            offset: spec.offset.unwrap_or(0),
            limit: spec.limit,
        })
    }

    /// Sequences of the records this plan selects, as of `snapshot`, ascending.
    ///
    /// Entities with no qualifying version contribute nothing.
    pub fn candidates(&self, versions: &VersionIndex, snapshot: u64) -> Vec<u64> {
        let mut sequences = Vec::new();

        match &self.id {
            Some(id) => self.select(versions, id, snapshot, &mut sequences),
            None => {
                for id in versions.ids(&self.entity_type) {
                    self.select(versions, id, snapshot, &mut sequences);
                }
                sequences.sort_unstable();
            }
        }

        sequences
    }

    fn select(&self, versions: &VersionIndex, id: &str, snapshot: u64, out: &mut Vec<u64>) {
        let et = self.entity_type.as_str();
        let seq = |e: &VersionEntry| e.sequence;

        match self.mode {
            VersionMode::Latest => out.extend(versions.latest(et, id, snapshot).as_ref().map(seq)),
            VersionMode::All => out.extend(versions.versions(et, id, snapshot).iter().map(seq)),
            VersionMode::AsOf(t) => out.extend(versions.as_of(et, id, t, snapshot).as_ref().map(seq)),
            VersionMode::AllAsOf(t) => out.extend(
                versions
                    .versions(et, id, snapshot)
                    .iter()
                    .filter(|e| e.timestamp <= t)
                    .map(seq),
            ),
        }
    }
}

fn parse_sort_key(raw: &Value) -> Result<SortKey> {
    let (name, direction) = match raw {
        Value::String(name) => (name.as_str(), SortDirection::Asc),
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(name)] => (name.as_str(), SortDirection::Asc),
            [Value::String(name), Value::String(dir)] => (name.as_str(), SortDirection::parse(dir)?),
            _ => return Err(bad_sort_key(raw)),
        },
        _ => return Err(bad_sort_key(raw)),
    };

    Ok(SortKey {
        field: Field::parse(name)?,
        direction,
    })
}

fn bad_sort_key(raw: &Value) -> LedgerError {
    LedgerError::InvalidQuerySpec(format!(
        "`order-by` entries must be \"field\" or [\"field\", \"asc\"|\"desc\"], got {}",
        raw
    ))
}

//! Query specification
//!
//! The declarative, data-shaped description of what a caller wants back.
//! Nothing here is validated beyond its JSON shape; [`QueryPlan::compile`]
//! does the real checking.
//!
//! [`QueryPlan::compile`]: super::QueryPlan::compile

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, Result};

use super::SortDirection;

/// A query, as data.
///
/// JSON form (every field except `entity-type` optional):
/// ```text
/// {
///   "entity-type": "transaction",
///   "id": "tx-1",
///   "versions": "all",
///   "as-of": "2024-03-20T00:00:00Z",
///   "filters": { "amount": [">", 100], "bank": "bofa" },
///   "order-by": [["amount", "desc"], "date"],
///   "limit": 10,
///   "offset": 20
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `"all"` or `"latest"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<String>,

    /// Integer milliseconds, RFC 3339 string or `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<Value>,

    /// field → exact value or `[op, ...]` predicate
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Value>,

    /// `"field"` or `["field", "asc" | "desc"]`, most significant first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl QuerySpec {
    /// Start a query over one entity type
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON query; unknown keys and wrong shapes are `InvalidQuerySpec`
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| LedgerError::InvalidQuerySpec(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| LedgerError::InvalidQuerySpec(e.to_string()))
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn all_versions(mut self) -> Self {
        self.versions = Some("all".to_string());
        self
    }

    pub fn as_of(mut self, timestamp: impl Into<Value>) -> Self {
        self.as_of = Some(timestamp.into());
        self
    }

    pub fn filter(mut self, field: impl Into<String>, predicate: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), predicate.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(Value::Array(vec![
            Value::String(field.into()),
            Value::String(direction.as_str().to_string()),
        ]));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

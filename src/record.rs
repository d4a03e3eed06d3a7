//! Entity Records
//!
//! The atomic unit the store persists, plus the caller-facing metadata map.
//!
//! A record is written once by a successful append and never mutated;
//! "updating" an entity appends a record with the next version.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LedgerError, Result};

// =============================================================================
// Metadata Keys
// =============================================================================

pub const ENTITY_TYPE_KEY: &str = "entity-type";
pub const AUTHOR_KEY: &str = "author";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const PROVENANCE_KEY: &str = "provenance";
pub const ID_KEY: &str = "id";

/// A query result. Records are immutable, so results share them.
pub type EntitySnapshot = Arc<EntityRecord>;

// =============================================================================
// Entity Record
// =============================================================================

/// One version of one entity, as stored in the log
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Global write order, assigned by the log (starts at 1)
    pub sequence: u64,

    /// Stable identifier of the logical entity
    pub id: String,

    /// Category tag; partitions the version index
    pub entity_type: String,

    /// 1 for the first state of an id, +1 per later distinct append
    pub version: u64,

    /// Opaque caller payload
    pub data: Value,

    /// Caller metadata (`entity-type`, `author`, `timestamp`, `provenance`, ...)
    pub metadata: Metadata,

    /// Content digest over entity type, data and metadata
    pub hash: ContentHash,

    /// Logical time from `metadata.timestamp`, in milliseconds
    pub timestamp: i64,

    /// Commit time from the store's clock, in milliseconds
    pub recorded_at: i64,
}

impl EntityRecord {
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            id: self.id.clone(),
            version: self.version,
            sequence: self.sequence,
        }
    }
}

/// A record that has passed validation but has not been sequenced yet
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub id: String,
    pub entity_type: String,
    pub version: u64,
    pub data: Value,
    pub metadata: Metadata,
    pub hash: ContentHash,
    pub timestamp: i64,
    pub recorded_at: i64,
}

impl NewRecord {
    /// Attach the sequence number assigned by the log
    pub fn into_record(self, sequence: u64) -> EntityRecord {
        EntityRecord {
            sequence,
            id: self.id,
            entity_type: self.entity_type,
            version: self.version,
            data: self.data,
            metadata: self.metadata,
            hash: self.hash,
            timestamp: self.timestamp,
            recorded_at: self.recorded_at,
        }
    }
}

/// Where a record sits: which entity, which version, which log position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIdentity {
    pub id: String,
    pub version: u64,
    pub sequence: u64,
}

// =============================================================================
// Content Hash
// =============================================================================

/// Lowercase hex SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Structured provenance attached to every append
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

/// The metadata fields an append cannot do without
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredFields {
    pub entity_type: String,
    pub author: String,
    pub timestamp: i64,
}

impl Metadata {
    /// Metadata carrying the three required fields
    pub fn new(
        entity_type: impl Into<String>,
        author: impl Into<String>,
        timestamp: impl Into<Value>,
    ) -> Self {
        Self::default()
            .with(ENTITY_TYPE_KEY, entity_type.into())
            .with(AUTHOR_KEY, author.into())
            .with(TIMESTAMP_KEY, timestamp.into())
    }

    /// Wrap an arbitrary JSON value; anything but an object is rejected
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(LedgerError::InvalidMetadata(format!(
                "metadata must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with_provenance(self, provenance: impl Into<Value>) -> Self {
        self.with(PROVENANCE_KEY, provenance)
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with(ID_KEY, id.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.0.get(ENTITY_TYPE_KEY).and_then(Value::as_str)
    }

    pub fn author(&self) -> Option<&str> {
        self.0.get(AUTHOR_KEY).and_then(Value::as_str)
    }

    pub fn provenance(&self) -> Option<&Value> {
        self.0.get(PROVENANCE_KEY)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_KEY).and_then(Value::as_str)
    }

    /// Check `entity-type`, `author` and `timestamp` are present and well-formed
    pub fn validate(&self) -> Result<RequiredFields> {
        let entity_type = self
            .entity_type()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(ENTITY_TYPE_KEY))?;

        let author = self
            .author()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(AUTHOR_KEY))?;

        let raw = self.0.get(TIMESTAMP_KEY).ok_or_else(|| missing(TIMESTAMP_KEY))?;
        let timestamp = parse_timestamp(raw).ok_or_else(|| {
            LedgerError::InvalidMetadata(format!("unreadable `timestamp`: {}", raw))
        })?;

        Ok(RequiredFields {
            entity_type: entity_type.to_string(),
            author: author.to_string(),
            timestamp,
        })
    }
}

fn missing(key: &str) -> LedgerError {
    LedgerError::InvalidMetadata(format!("missing `{}`", key))
}

// =============================================================================
// Logical Time
// =============================================================================

/// Normalise a logical timestamp to milliseconds since the unix epoch.
///
/// Accepts an integer (already milliseconds), an RFC 3339 string, or a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

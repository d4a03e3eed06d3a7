//! Fields, predicates and value ordering

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::record::EntityRecord;

// =============================================================================
// Fields
// =============================================================================

/// Something a filter or sort key can read from a record
///
/// - `id`, `version`, `sequence`, `entity-type`, `hash`: record attributes
/// - `metadata.a.b`: a path into the metadata map
/// - `data.a.b` or bare `a.b`: a path into the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Id,
    Version,
    Sequence,
    EntityType,
    Hash,
    Metadata(Vec<String>),
    Data(Vec<String>),
}

impl Field {
    pub fn parse(name: &str) -> Result<Self> {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(unrecognized(name));
        }

        let owned = |rest: &[&str]| rest.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        match segments.as_slice() {
            ["id"] => Ok(Field::Id),
            ["version"] => Ok(Field::Version),
            ["sequence"] => Ok(Field::Sequence),
            ["entity-type"] => Ok(Field::EntityType),
            ["hash"] => Ok(Field::Hash),
            ["id" | "version" | "sequence" | "entity-type" | "hash", ..] => Err(unrecognized(name)),
            ["metadata"] | ["data"] => Err(unrecognized(name)),
            ["metadata", rest @ ..] => Ok(Field::Metadata(owned(rest))),
            ["data", rest @ ..] => Ok(Field::Data(owned(rest))),
            all => Ok(Field::Data(owned(all))),
        }
    }

    /// Read the field; `None` when the record has no such value
    pub fn resolve<'a>(&self, record: &'a EntityRecord) -> Option<Cow<'a, Value>> {
        match self {
            Field::Id => Some(Cow::Owned(Value::from(record.id.as_str()))),
            Field::Version => Some(Cow::Owned(Value::from(record.version))),
            Field::Sequence => Some(Cow::Owned(Value::from(record.sequence))),
            Field::EntityType => Some(Cow::Owned(Value::from(record.entity_type.as_str()))),
            Field::Hash => Some(Cow::Owned(Value::from(record.hash.as_str()))),
            Field::Metadata(path) => {
                let (first, rest) = path.split_first()?;
                walk(record.metadata.get(first)?, rest).map(Cow::Borrowed)
            }
            Field::Data(path) => walk(&record.data, path).map(Cow::Borrowed),
        }
    }
}

fn walk<'a>(mut value: &'a Value, path: &[String]) -> Option<&'a Value> {
    for segment in path {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn unrecognized(name: &str) -> LedgerError {
    LedgerError::InvalidQuerySpec(format!("unrecognized field `{}`", name))
}

// =============================================================================
// Predicates
// =============================================================================

/// A test applied to one field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Value),
    GreaterThan(Value),
    GreaterOrEqual(Value),
    LessThan(Value),
    LessOrEqual(Value),
    /// Inclusive on both ends
    Between(Value, Value),
}

impl Predicate {
    /// Parse a filter value.
    ///
    /// An array whose first element is a string is an operator form
    /// (`[">", v]`, `["between", lo, hi]`, `["=", v]`, ...); anything else is
    /// an exact value. Use `["=", [..]]` to match an array literally.
    pub fn parse(field: &str, raw: &Value) -> Result<Self> {
        let items = match raw {
            Value::Array(items) => items,
            other => return Ok(Predicate::Equals(other.clone())),
        };
        let op = match items.first() {
            Some(Value::String(op)) => op.as_str(),
            _ => return Ok(Predicate::Equals(raw.clone())),
        };

        let arity = |n: usize| -> Result<()> {
            if items.len() == n + 1 {
                Ok(())
            } else {
                Err(LedgerError::InvalidQuerySpec(format!(
                    "`{}` on `{}` takes {} operand(s), got {}",
                    op,
                    field,
                    n,
                    items.len() - 1
                )))
            }
        };

        match op {
            "=" => arity(1).map(|_| Predicate::Equals(items[1].clone())),
            ">" => arity(1).map(|_| Predicate::GreaterThan(items[1].clone())),
            ">=" => arity(1).map(|_| Predicate::GreaterOrEqual(items[1].clone())),
            "<" => arity(1).map(|_| Predicate::LessThan(items[1].clone())),
            "<=" => arity(1).map(|_| Predicate::LessOrEqual(items[1].clone())),
            "between" => arity(2).map(|_| Predicate::Between(items[1].clone(), items[2].clone())),
            other => Err(LedgerError::InvalidQuerySpec(format!(
                "unknown operator `{}` on `{}`; to match an array exactly, write [\"=\", {}]",
                other, field, raw
            ))),
        }
    }

    /// A missing field never matches
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let cmp = |bound: &Value| compare_values(value, bound);

        match self {
            Predicate::Equals(expected) => value == expected || cmp(expected) == Some(Ordering::Equal),
            Predicate::GreaterThan(b) => cmp(b) == Some(Ordering::Greater),
            Predicate::GreaterOrEqual(b) => matches!(cmp(b), Some(Ordering::Greater | Ordering::Equal)),
            Predicate::LessThan(b) => cmp(b) == Some(Ordering::Less),
            Predicate::LessOrEqual(b) => matches!(cmp(b), Some(Ordering::Less | Ordering::Equal)),
            Predicate::Between(lo, hi) => {
                matches!(cmp(lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cmp(hi), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

/// Order two scalars of the same kind; `None` when they are not comparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(LedgerError::InvalidQuerySpec(format!(
                "sort direction must be `asc` or `desc`, got `{}`",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn compare(&self, a: &EntityRecord, b: &EntityRecord) -> Ordering {
        let ord = total_order(
            self.field.resolve(a).as_deref(),
            self.field.resolve(b).as_deref(),
        );
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Ordering used for sorting: missing < null < bool < number < string < array < object.
/// Values of the same kind compare naturally; arrays and objects tie.
fn total_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

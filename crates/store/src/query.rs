//! Queries: single-field equality filter plus single-field ordering.
//!
//! This mirrors what the managed store's indexes support. Compound
//! filter-plus-sort is deliberately absent; callers that need it filter
//! client-side after the fetch and accept the scaling boundary.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A standing query over one collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    filter: Option<(String, Value)>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    /// All documents in the collection, unordered.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to documents whose `field` equals `value`.
    #[must_use]
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            filter: Some((field.into(), value.into())),
            order_by: None,
        }
    }

    /// Order results by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Whether a document matches the filter.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|(field, value)| doc.field(field) == Some(value))
    }

    /// Apply filter and ordering to a snapshot of the collection.
    #[must_use]
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut result: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if let Some((field, direction)) = &self.order_by {
            result.sort_by(|a, b| {
                let ord = compare_fields(a.field(field), b.field(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        result
    }
}

/// Compare two optional JSON values for ordering. Missing fields sort first
/// ascending (so last descending); mixed types fall back to their serialized
/// form.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

//! Equality filters for filtered scans
//!
//! Every query pair `key=value` requires the document field `key` to be the
//! JSON string `value`. Numbers and booleans never match, even when their
//! textual form is equal.

use serde_json::Value;

use crate::types::{decode_document, Document};

/// Conjunction of field equality constraints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EqualityFilter {
    constraints: Vec<(String, String)>,
}

impl EqualityFilter {
    /// Build a filter from query pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            constraints: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// True when no constraint is present
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constraints
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Test a decoded document
    pub fn matches(&self, doc: &Document) -> bool {
        self.constraints.iter().all(|(field, expected)| {
            matches!(doc.get(field), Some(Value::String(actual)) if actual == expected)
        })
    }

    /// Test raw stored bytes
    ///
    /// Bytes that do not decode count as a document with no fields: they fail
    /// every non-empty filter and pass the empty one.
    pub fn matches_raw(&self, raw: &[u8]) -> bool {
        if self.is_empty() {
            return true;
        }
        match decode_document(raw) {
            Some(doc) => self.matches(&doc),
            None => self.matches(&Document::new()),
        }
    }
}

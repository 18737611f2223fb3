//! Documents and their identifiers

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::storage::partition::key_hash_u64;
use crate::types::ValidationError;

/// A stored document: an arbitrary JSON object
pub type Document = Map<String, Value>;

/// Identifier of a stored document
///
/// Serializes untagged, so a sequence id encodes as a JSON number and a key
/// as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum DocumentId {
    /// Store-assigned sequence number
    Seq(u64),
    /// Client-supplied key (the document's `uuid` field)
    Key(String),
}

impl DocumentId {
    /// Hash used to place the document in a page partition
    pub fn partition_hash(&self) -> u64 {
        match self {
            DocumentId::Seq(seq) => key_hash_u64(&seq.to_be_bytes()),
            DocumentId::Key(key) => key_hash_u64(key.as_bytes()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Seq(seq) => write!(f, "{}", seq),
            DocumentId::Key(key) => f.write_str(key),
        }
    }
}

/// Decode stored bytes into a document, `None` if they are not a JSON object
pub fn decode_document(raw: &[u8]) -> Option<Document> {
    serde_json::from_slice(raw).ok()
}

/// Parse a request body into a document
pub fn parse_document(body: &[u8]) -> Result<Document, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MalformedBody("request body is empty".to_string()));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(ValidationError::MalformedBody(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ValidationError::MalformedBody(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

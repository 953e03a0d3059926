//! Document-store vocabulary: documents, identifiers, filters and updates.

pub mod document;
pub mod filter;
pub mod update;

use thiserror::Error;

/// A JSON payload that cannot be used as a filter or update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must be a JSON object, got {found}")]
pub struct PayloadError {
    pub kind: &'static str,
    pub found: &'static str,
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

//! Update - Field mutations applied atomically to one matched document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{json_type_name, PayloadError};

/// Operators understood by every store adapter
pub const SET: &str = "$set";
pub const UNSET: &str = "$unset";
pub const INC: &str = "$inc";
pub const PUSH: &str = "$push";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Update(Map<String, Value>);

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(SET, field.into(), value.into())
    }

    pub fn unset(self, field: impl Into<String>) -> Self {
        self.operator(UNSET, field.into(), Value::String(String::new()))
    }

    pub fn inc(self, field: impl Into<String>, by: impl Into<Value>) -> Self {
        self.operator(INC, field.into(), by.into())
    }

    /// Append `value` to the array at `field`
    pub fn push(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(PUSH, field.into(), value.into())
    }

    fn operator(mut self, op: &str, field: String, value: Value) -> Self {
        let entry = self
            .0
            .entry(op.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(fields) = entry {
            fields.insert(field, value);
        }
        self
    }

    fn merge_operator(&mut self, op: String, value: Value) {
        if let Value::Object(fields) = &value {
            if let Some(Value::Object(existing)) = self.0.get_mut(&op) {
                existing.extend(fields.clone());
                return;
            }
        }
        self.0.insert(op, value);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Update {
    type Error = PayloadError;

    /// Accept an update payload. Top-level keys that are not operators are
    /// folded into `$set`, so `{"placeId": "p-2"}` means
    /// `{"$set": {"placeId": "p-2"}}`. An explicit operator object is merged
    /// with whatever the plain keys already put under that operator.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(PayloadError {
                    kind: "update",
                    found: json_type_name(&other),
                })
            }
        };

        let mut update = Self::new();
        for (key, value) in map {
            if key.starts_with('$') {
                update.merge_operator(key, value);
            } else {
                update = update.set(key, value);
            }
        }
        Ok(update)
    }
}

impl core::fmt::Display for Update {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| core::fmt::Error)?;
        f.write_str(&rendered)
    }
}

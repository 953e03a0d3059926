//! Filter - Which stored documents an operation applies to
//!
//! A filter is a JSON object in the familiar document-store query shape:
//! `{"userId": "u-1", "startDate": {"$gte": "2026-01-01"}}`. This type only
//! carries the predicate; evaluating it is the store's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{DocumentId, ID_FIELD};
use super::{json_type_name, PayloadError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// The empty filter, matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the document with the given identifier
    pub fn by_id(id: &DocumentId) -> Self {
        Self::new().eq(ID_FIELD, *id)
    }

    /// `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$ne", value.into())
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$gt", value.into())
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$gte", value.into())
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$lt", value.into())
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$lte", value.into())
    }

    /// `field` equals any of `values`
    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        self.operator(field, "$in", Value::Array(values))
    }

    pub fn exists(self, field: impl Into<String>, exists: bool) -> Self {
        self.operator(field, "$exists", Value::Bool(exists))
    }

    /// Match documents satisfying any of `filters`
    pub fn any_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        let branches = filters.into_iter().map(|f| Value::Object(f.0)).collect();
        let mut map = Map::new();
        map.insert("$or".to_string(), Value::Array(branches));
        Self(map)
    }

    /// Attach an operator condition, merging with operators already set on
    /// the same field so `gte(..).lt(..)` builds a range.
    fn operator(mut self, field: impl Into<String>, op: &str, value: Value) -> Self {
        let field = field.into();
        match self.0.get_mut(&field) {
            Some(Value::Object(ops)) if ops.keys().all(|k| k.starts_with('$')) => {
                ops.insert(op.to_string(), value);
            }
            _ => {
                let mut ops = Map::new();
                ops.insert(op.to_string(), value);
                self.0.insert(field, Value::Object(ops));
            }
        }
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Filter {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PayloadError {
                kind: "filter",
                found: json_type_name(&other),
            }),
        }
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl core::fmt::Display for Filter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| core::fmt::Error)?;
        f.write_str(&rendered)
    }
}

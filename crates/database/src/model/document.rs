//! Document - The capability set a type needs to live in a collection
//!
//! A document is anything with a unique identifier that serializes to and
//! from the store's record format. Identifiers are generated by the
//! repository on create; callers only ever supply [`Document::Fields`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Key under which every record stores its identifier
pub const ID_FIELD: &str = "_id";

/// The store's wire shape for one document
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse_str(input: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(input).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentId> for serde_json::Value {
    fn from(id: DocumentId) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

/// Trait for types stored as documents in a single collection.
///
/// The type's serialized form must carry its identifier under
/// [`ID_FIELD`], e.g. with `#[serde(rename = "_id")]`.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection backing this document type
    const COLLECTION: &'static str;

    /// The document without its identifier, as accepted by `create`
    type Fields: Serialize + Send + Sync;

    /// Returns the unique identifier of this document
    fn id(&self) -> &DocumentId;
}

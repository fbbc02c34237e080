//! Input records consumed by the bulk writer

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the identifier property on every entity node
pub const ID_KEY: &str = "ID";

/// One entity ("person"): a unique identifier plus scalar attributes.
///
/// Attribute order is kept so the generated upsert text is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub attributes: IndexMap<String, Value>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Attributes other than the identifier
    pub fn properties(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter().filter(|(k, _)| k.as_str() != ID_KEY)
    }
}

/// A directed relationship between two entity identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
}

impl RelationshipRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::DatabaseError;

/// Conjunction of top-level field equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Map<String, Value>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::all().eq("_id", id.into())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    /// JSON object used for containment queries.
    pub fn to_json(&self) -> Value {
        Value::Object(self.conditions.clone())
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

/// Selects elements inside an embedded array.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMatch {
    Field { field: String, value: Value },
}

impl ElementMatch {
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        ElementMatch::Field {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, element: &Value) -> bool {
        match self {
            ElementMatch::Field { field, value } => element.get(field) == Some(value),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ElementMatch::Field { field, value } => {
                let mut m = Map::new();
                m.insert(field.clone(), value.clone());
                Value::Object(m)
            }
        }
    }
}

/// Collection-scoped document store.
///
/// Every document carries a string `_id`. Updates use set semantics:
/// top-level fields of the patch replace the stored ones.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn insert(&self, doc: Value) -> Result<String, DatabaseError>;

    /// Matching documents in insertion order.
    async fn find(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<Value>, DatabaseError>;

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Patch the first matching document. Returns the number updated.
    async fn update_one(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError>;

    async fn update_many(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError>;

    /// Patch the elements of `array_field` selected by `element` in every
    /// matching document. Returns the number of documents touched.
    async fn update_array_elements(
        &self,
        filter: &Filter,
        array_field: &str,
        element: &ElementMatch,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError>;

    /// Append `value` to `array_field` of the first matching document and
    /// apply `patch` in the same write. A missing array is created.
    /// Returns the number of documents updated.
    async fn push_array_element(
        &self,
        filter: &Filter,
        array_field: &str,
        value: Value,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError>;

    async fn delete_one(&self, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, DatabaseError>;
}

pub(crate) fn document_id(doc: &Value) -> Result<String, DatabaseError> {
    doc.get("_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DatabaseError::QueryError("document is missing a string _id".to_string()))
}

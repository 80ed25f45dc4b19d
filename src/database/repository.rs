use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use super::collection::{Collection, ElementMatch, Filter};
use super::DatabaseError;

/// Typed access to one collection.
pub struct Repository<T> {
    collection: Arc<dyn Collection>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self {
            collection,
            _phantom: PhantomData,
        }
    }

    pub fn collection(&self) -> &Arc<dyn Collection> {
        &self.collection
    }

    pub async fn select_any(&self, filter: Filter) -> Result<Vec<T>, DatabaseError> {
        self.collection
            .find(&filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<T>, DatabaseError> {
        match self.collection.find_one(&filter).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn select_404(&self, filter: Filter) -> Result<T, DatabaseError> {
        self.select_one(filter)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Record not found in {}", self.collection.name())))
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, DatabaseError> {
        self.collection.count(&filter).await
    }

    pub async fn insert(&self, record: &T) -> Result<String, DatabaseError> {
        self.collection.insert(serde_json::to_value(record)?).await
    }

    pub async fn update(&self, filter: Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        self.collection.update_one(&filter, patch).await
    }

    /// Overwrite every field of the stored record with `record`.
    pub async fn replace(&self, filter: Filter, record: &T) -> Result<u64, DatabaseError> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => self.collection.update_one(&filter, fields).await,
            _ => Err(DatabaseError::QueryError("record must serialize to an object".to_string())),
        }
    }

    pub async fn update_many(&self, filter: Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        self.collection.update_many(&filter, patch).await
    }

    pub async fn update_elements(
        &self,
        filter: Filter,
        array_field: &str,
        element: ElementMatch,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        self.collection
            .update_array_elements(&filter, array_field, &element, patch)
            .await
    }

    /// Atomically append one element to an embedded array.
    pub async fn push_element<E: Serialize>(
        &self,
        filter: Filter,
        array_field: &str,
        element: &E,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        let value = serde_json::to_value(element)?;
        self.collection
            .push_array_element(&filter, array_field, value, patch)
            .await
    }

    pub async fn delete(&self, filter: Filter) -> Result<u64, DatabaseError> {
        self.collection.delete_one(&filter).await
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<u64, DatabaseError> {
        self.collection.delete_many(&filter).await
    }
}

/// Build a patch map from a `json!({...})` object literal.
pub fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

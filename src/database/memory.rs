use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::collection::{document_id, Collection, ElementMatch, Filter};
use super::DatabaseError;

/// In-process collection with the same semantics as the Postgres one.
pub struct MemoryCollection {
    name: String,
    unique_fields: Vec<String>,
    docs: RwLock<Vec<Value>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_fields: Vec::new(),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Reject inserts that repeat the value of `field`.
    pub fn with_unique(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }
}

fn apply_patch(doc: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(obj) = doc {
        for (k, v) in patch {
            obj.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, doc: Value) -> Result<String, DatabaseError> {
        let id = document_id(&doc)?;
        let mut docs = self.docs.write().await;

        if docs.iter().any(|d| d.get("_id").and_then(Value::as_str) == Some(id.as_str())) {
            return Err(DatabaseError::Duplicate(format!("{}._id = {}", self.name, id)));
        }
        for field in &self.unique_fields {
            if let Some(value) = doc.get(field) {
                if docs.iter().any(|d| d.get(field) == Some(value)) {
                    return Err(DatabaseError::Duplicate(format!("{}.{}", self.name, field)));
                }
            }
        }

        docs.push(doc);
        Ok(id)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| filter.matches(d)).cloned())
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn update_one(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| filter.matches(d)) {
            Some(doc) => {
                apply_patch(doc, &patch);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_many(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        let mut updated = 0;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            apply_patch(doc, &patch);
            updated += 1;
        }
        Ok(updated)
    }

    async fn update_array_elements(
        &self,
        filter: &Filter,
        array_field: &str,
        element: &ElementMatch,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        let mut touched = 0;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            let Some(Value::Array(items)) = doc.get_mut(array_field) else {
                continue;
            };
            let mut hit = false;
            for item in items.iter_mut().filter(|i| element.matches(i)) {
                apply_patch(item, &patch);
                hit = true;
            }
            if hit {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn push_array_element(
        &self,
        filter: &Filter,
        array_field: &str,
        value: Value,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        let Some(Value::Object(doc)) = docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(0);
        };
        let slot = doc
            .entry(array_field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items.push(value),
            _ => {
                return Err(DatabaseError::QueryError(format!(
                    "{}.{} is not an array",
                    self.name, array_field
                )))
            }
        }
        for (k, v) in patch {
            doc.insert(k, v);
        }
        Ok(1)
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        match docs.iter().position(|d| filter.matches(d)) {
            Some(pos) => {
                docs.remove(pos);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_find_update_delete() {
        let c = MemoryCollection::new("things");
        c.insert(json!({"_id": "1", "status": "a"})).await.unwrap();
        c.insert(json!({"_id": "2", "status": "b"})).await.unwrap();

        assert_eq!(c.count(&Filter::all()).await.unwrap(), 2);
        assert_eq!(c.update_one(&Filter::by_id("1"), patch(json!({"status": "c"}))).await.unwrap(), 1);
        let one = c.find_one(&Filter::by_id("1")).await.unwrap().unwrap();
        assert_eq!(one["status"], "c");

        assert_eq!(c.update_many(&Filter::all(), patch(json!({"x": 1}))).await.unwrap(), 2);
        assert_eq!(c.delete_many(&Filter::all().eq("x", 1)).await.unwrap(), 2);
        assert_eq!(c.delete_one(&Filter::by_id("1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unique_fields_reject_duplicates() {
        let c = MemoryCollection::new("sigs").with_unique("response_id");
        c.insert(json!({"_id": "1", "response_id": "r"})).await.unwrap();
        let err = c.insert(json!({"_id": "2", "response_id": "r"})).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));
        let err = c.insert(json!({"_id": "1", "response_id": "s"})).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));
    }

    #[tokio::test]
    async fn array_elements_are_patched_in_place() {
        let c = MemoryCollection::new("wf");
        c.insert(json!({"_id": "w", "nodes": [{"id": "a", "t": 1}, {"id": "b", "t": 2}]}))
            .await
            .unwrap();
        c.insert(json!({"_id": "v", "nodes": []})).await.unwrap();

        let n = c
            .update_array_elements(&Filter::by_id("w"), "nodes", &ElementMatch::by("id", "b"), patch(json!({"t": 9})))
            .await
            .unwrap();
        assert_eq!(n, 1);
        let doc = c.find_one(&Filter::by_id("w")).await.unwrap().unwrap();
        assert_eq!(doc["nodes"][0]["t"], 1);
        assert_eq!(doc["nodes"][1]["t"], 9);

        let n = c
            .update_array_elements(&Filter::all(), "nodes", &ElementMatch::by("id", "zz"), patch(json!({"t": 0})))
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn push_appends_and_creates_missing_array() {
        let c = MemoryCollection::new("responses");
        c.insert(json!({"_id": "r", "messages": [{"n": 1}]})).await.unwrap();
        c.insert(json!({"_id": "s"})).await.unwrap();

        let n = c
            .push_array_element(&Filter::by_id("r"), "messages", json!({"n": 2}), patch(json!({"seen": true})))
            .await
            .unwrap();
        assert_eq!(n, 1);
        let doc = c.find_one(&Filter::by_id("r")).await.unwrap().unwrap();
        assert_eq!(doc["messages"], json!([{"n": 1}, {"n": 2}]));
        assert_eq!(doc["seen"], true);

        c.push_array_element(&Filter::by_id("s"), "messages", json!({"n": 1}), Map::new())
            .await
            .unwrap();
        let doc = c.find_one(&Filter::by_id("s")).await.unwrap().unwrap();
        assert_eq!(doc["messages"], json!([{"n": 1}]));

        let n = c
            .push_array_element(&Filter::by_id("missing"), "messages", json!({}), Map::new())
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}

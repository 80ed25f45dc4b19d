use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::collection::{document_id, Collection, ElementMatch, Filter};
use super::DatabaseError;

/// Collection backed by a `(id TEXT, body JSONB, created_at)` table.
///
/// Equality filters compile to JSONB containment (`body @> $1`), so a
/// GIN index on `body` serves every lookup.
#[derive(Clone)]
pub struct PgCollection {
    table: String,
    pool: PgPool,
}

impl PgCollection {
    pub fn new(table: impl Into<String>, pool: PgPool) -> Self {
        Self {
            table: table.into(),
            pool,
        }
    }

    fn quoted(&self) -> String {
        quote_identifier(&self.table)
    }
}

/// Quote SQL identifier to prevent injection
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn map_insert_error(table: &str, err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DatabaseError::Duplicate(format!("{} ({})", table, db_err.constraint().unwrap_or("primary key")))
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn insert(&self, doc: Value) -> Result<String, DatabaseError> {
        let id = document_id(&doc)?;
        let sql = format!("INSERT INTO {} (id, body) VALUES ($1, $2)", self.quoted());
        sqlx::query(&sql)
            .bind(&id)
            .bind(&doc)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(&self.table, e))?;
        Ok(id)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let sql = format!(
            "SELECT body FROM {} WHERE body @> $1 ORDER BY created_at, id",
            self.quoted()
        );
        let rows = sqlx::query_scalar::<_, Value>(&sql)
            .bind(filter.to_json())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        let sql = format!(
            "SELECT body FROM {} WHERE body @> $1 ORDER BY created_at, id LIMIT 1",
            self.quoted()
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(filter.to_json())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE body @> $1", self.quoted());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.to_json())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn update_one(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        let table = self.quoted();
        let sql = format!(
            "UPDATE {table} SET body = body || $2 \
             WHERE id = (SELECT id FROM {table} WHERE body @> $1 ORDER BY created_at, id LIMIT 1)"
        );
        let result = sqlx::query(&sql)
            .bind(filter.to_json())
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_many(&self, filter: &Filter, patch: Map<String, Value>) -> Result<u64, DatabaseError> {
        let sql = format!("UPDATE {} SET body = body || $2 WHERE body @> $1", self.quoted());
        let result = sqlx::query(&sql)
            .bind(filter.to_json())
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_array_elements(
        &self,
        filter: &Filter,
        array_field: &str,
        element: &ElementMatch,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        // $2 array field, $3 element containment, $4 patch
        let sql = format!(
            "UPDATE {} SET body = jsonb_set(body, ARRAY[$2::text], ( \
                SELECT COALESCE(jsonb_agg( \
                    CASE WHEN jsonb_typeof(a.elem) = 'object' AND a.elem @> $3 \
                         THEN a.elem || $4 ELSE a.elem END ORDER BY a.ord), '[]'::jsonb) \
                FROM jsonb_array_elements(body -> $2::text) WITH ORDINALITY AS a(elem, ord))) \
             WHERE body @> $1 \
               AND jsonb_typeof(body -> $2::text) = 'array' \
               AND EXISTS (SELECT 1 FROM jsonb_array_elements(body -> $2::text) AS e(elem) \
                           WHERE jsonb_typeof(e.elem) = 'object' AND e.elem @> $3)",
            self.quoted()
        );
        let result = sqlx::query(&sql)
            .bind(filter.to_json())
            .bind(array_field)
            .bind(element.to_json())
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn push_array_element(
        &self,
        filter: &Filter,
        array_field: &str,
        value: Value,
        patch: Map<String, Value>,
    ) -> Result<u64, DatabaseError> {
        // Single statement, so concurrent appends serialize on the row lock.
        let table = self.quoted();
        let sql = format!(
            "UPDATE {table} SET body = jsonb_set(body, ARRAY[$2::text],                  COALESCE(NULLIF(body -> $2::text, 'null'::jsonb), '[]'::jsonb) || jsonb_build_array($3::jsonb)) || $4              WHERE id = (SELECT id FROM {table} WHERE body @> $1 ORDER BY created_at, id LIMIT 1)"
        );
        let result = sqlx::query(&sql)
            .bind(filter.to_json())
            .bind(array_field)
            .bind(value)
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let table = self.quoted();
        let sql = format!(
            "DELETE FROM {table} \
             WHERE id = (SELECT id FROM {table} WHERE body @> $1 ORDER BY created_at, id LIMIT 1)"
        );
        let result = sqlx::query(&sql).bind(filter.to_json()).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE body @> $1", self.quoted());
        let result = sqlx::query(&sql).bind(filter.to_json()).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("responses"), "\"responses\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}

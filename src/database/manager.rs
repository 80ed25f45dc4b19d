use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::collection::Collection;
use super::memory::MemoryCollection;
use super::postgres::{quote_identifier, PgCollection};
use super::DatabaseError;
use crate::config::DatabaseConfig;
use crate::models::collections;

/// Fields that must be unique per collection, enforced by the store.
const UNIQUE_FIELDS: [(&str, &str); 4] = [
    (collections::APPROVED_DOCUMENTS, "response_id"),
    (collections::CLIENT_SIGNATURES, "response_id"),
    (collections::USERS, "email_index"),
    (collections::SESSION_TOKENS, "token"),
];

/// Explicitly constructed Postgres handle, shared by every collection.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Connected to database {}{}",
            parsed.host_str().unwrap_or("localhost"),
            parsed.path()
        );
        Ok(Self { pool })
    }

    /// Create collection tables and indexes. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for name in collections::ALL {
            let table = quote_identifier(name);
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} ( \
                    id TEXT PRIMARY KEY, \
                    body JSONB NOT NULL, \
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now())"
            );
            sqlx::query(&ddl).execute(&self.pool).await?;

            let gin = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {table} USING GIN (body jsonb_path_ops)",
                quote_identifier(&format!("{}_body_idx", name))
            );
            sqlx::query(&gin).execute(&self.pool).await?;
        }

        for (name, field) in UNIQUE_FIELDS {
            let ddl = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((body ->> '{}'))",
                quote_identifier(&format!("{}_{}_key", name, field)),
                quote_identifier(name),
                field
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        info!("Database schema is up to date");
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Result<PgCollection, DatabaseError> {
        if !is_valid_collection_name(name) {
            return Err(DatabaseError::InvalidCollectionName(name.to_string()));
        }
        Ok(PgCollection::new(name, self.pool.clone()))
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

/// Storage backend selected at startup.
#[derive(Clone)]
pub enum Backend {
    Postgres(Database),
    Memory(Arc<HashMap<String, Arc<MemoryCollection>>>),
}

impl Backend {
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.url {
            Some(_) => {
                let db = Database::connect(config).await?;
                db.migrate().await?;
                Ok(Backend::Postgres(db))
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
                Ok(Backend::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        let mut map = HashMap::new();
        for name in collections::ALL {
            let mut collection = MemoryCollection::new(name);
            for (unique_in, field) in UNIQUE_FIELDS {
                if unique_in == name {
                    collection = collection.with_unique(field);
                }
            }
            map.insert(name.to_string(), Arc::new(collection));
        }
        Backend::Memory(Arc::new(map))
    }

    pub fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DatabaseError> {
        match self {
            Backend::Postgres(db) => Ok(Arc::new(db.collection(name)?)),
            Backend::Memory(map) => map
                .get(name)
                .cloned()
                .map(|c| c as Arc<dyn Collection>)
                .ok_or_else(|| DatabaseError::InvalidCollectionName(name.to_string())),
        }
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        match self {
            Backend::Postgres(db) => db.health_check().await,
            Backend::Memory(_) => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Postgres(_) => "postgres",
            Backend::Memory(_) => "memory",
        }
    }
}

/// Collection names become table names: lowercase ASCII and underscores only.
fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_collection_names() {
        assert!(is_valid_collection_name("responses"));
        assert!(is_valid_collection_name("client_signatures"));
        assert!(!is_valid_collection_name("Responses"));
        assert!(!is_valid_collection_name("_hidden"));
        assert!(!is_valid_collection_name("users; DROP TABLE users"));
        assert!(!is_valid_collection_name(""));
    }

    #[tokio::test]
    async fn memory_backend_enforces_unique_signature_per_response() {
        let backend = Backend::in_memory();
        let sigs = backend.collection(collections::CLIENT_SIGNATURES).unwrap();
        sigs.insert(serde_json::json!({"_id": "a", "response_id": "r1"})).await.unwrap();
        let err = sigs
            .insert(serde_json::json!({"_id": "b", "response_id": "r1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));
        assert!(backend.collection("unknown").is_err());
    }
}

pub mod collection;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;

use thiserror::Error;

pub use collection::{Collection, ElementMatch, Filter};
pub use manager::{Backend, Database};
pub use memory::MemoryCollection;
pub use postgres::PgCollection;
pub use repository::{patch, Repository};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

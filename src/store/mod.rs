//! Document store abstraction.
//!
//! Journal data is laid out as nested collections
//! (`users/{user}/journals/{dateKey}/entries/{id}`), so the store exposes
//! path-addressed documents, single-collection queries and
//! collection-group queries. The gateway in `services::gateway` is the only
//! caller.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub mod memory;
pub mod path;
pub mod postgres;
pub mod query;
pub mod value;

pub use memory::MemoryStore;
pub use path::{CollectionPath, DocumentPath};
pub use postgres::PostgresStore;
pub use query::{Direction, Document, FilterOp, Query};
pub use value::{Fields, Value};

/// Structured status code of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The query needs an index that does not exist.
    FailedPrecondition,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FailedPrecondition => "failed-precondition",
            ErrorCode::NotFound => "not-found",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::ResourceExhausted => "resource-exhausted",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "failed-precondition" => Ok(ErrorCode::FailedPrecondition),
            "not-found" => Ok(ErrorCode::NotFound),
            "permission-denied" => Ok(ErrorCode::PermissionDenied),
            "unauthenticated" => Ok(ErrorCode::Unauthenticated),
            "resource-exhausted" => Ok(ErrorCode::ResourceExhausted),
            "unavailable" => Ok(ErrorCode::Unavailable),
            "internal" => Ok(ErrorCode::Internal),
            other => Err(format!("unknown store error code: {other}")),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(path: &DocumentPath) -> Self {
        Self::new(ErrorCode::NotFound, format!("No document at {path}"))
    }

    pub fn missing_index(collection_id: &str) -> Self {
        Self::new(
            ErrorCode::FailedPrecondition,
            format!("The query requires an index on collection group '{collection_id}'"),
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ErrorCode::Unavailable
            }
            sqlx::Error::RowNotFound => ErrorCode::NotFound,
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes a document, replacing any existing one at the same path.
    async fn put(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()>;

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Queries the documents directly inside one collection.
    async fn query(&self, collection: &CollectionPath, query: &Query) -> StoreResult<Vec<Document>>;

    /// Queries every collection named `collection_id` below `under`.
    async fn query_group(
        &self,
        collection_id: &str,
        under: &DocumentPath,
        query: &Query,
    ) -> StoreResult<Vec<Document>>;

    /// Documents of a collection, including parents that only exist
    /// because something is stored beneath them.
    async fn list_documents(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentPath>>;

    /// Fails with [`ErrorCode::NotFound`] when nothing is stored at `path`.
    async fn delete(&self, path: &DocumentPath) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}

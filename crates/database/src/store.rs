use crate::DbError;
use async_trait::async_trait;
use bson::{Bson, Document};

/// Matched and modified counts reported by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// The handful of document operations the maintenance tasks need.
///
/// Filters are plain equality documents. Every operation is awaited to
/// completion before the next one starts; implementations need not support
/// concurrent callers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Round-trips a no-op command to prove the server is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    /// Collection names in the database, sorted.
    async fn list_collections(&self) -> Result<Vec<String>, DbError>;

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError>;

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, DbError>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DbError>;

    /// Inserts `document` and returns its `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, DbError>;

    /// Applies `$set: set` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError>;

    /// Releases the connection. Callers go through `with_session`, which
    /// guarantees this runs exactly once.
    async fn close(&self) -> Result<(), DbError>;
}

use crate::DbError;
use crate::store::{DocumentStore, UpdateOutcome};
use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database};
use tracing::debug;

/// A `DocumentStore` backed by one MongoDB client and one database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), DbError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DbError::ConnectionError)?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, DbError> {
        let mut names = self.db.list_collection_names().await?;
        names.sort();
        Ok(names)
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError> {
        debug!(collection, %filter, "find");
        let docs = self.collection(collection).find(filter).await?.try_collect().await?;
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, DbError> {
        debug!(collection, %filter, "find_one");
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DbError> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson, DbError> {
        debug!(collection, "insert_one");
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError> {
        debug!(collection, %filter, %set, "update_one");
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn close(&self) -> Result<(), DbError> {
        // `shutdown` consumes the handle; clones share the same topology.
        self.client.clone().shutdown().await;
        debug!(database = self.db.name(), "connection closed");
        Ok(())
    }
}

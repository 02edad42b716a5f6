use crate::DbError;
use crate::store::{DocumentStore, UpdateOutcome};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// An in-process `DocumentStore` with equality-only filters.
///
/// Clones share state, so a test can hand one clone to `with_session` and
/// inspect the collections and close count through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<BTreeMap<String, Vec<Document>>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
    close_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `docs` as-is, creating the collection if needed.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut collections = self.lock();
        let target = collections.entry(collection.to_string()).or_default();
        for mut doc in docs {
            ensure_id(&mut doc);
            target.push(doc);
        }
    }

    /// Every document currently stored in `collection`, in insertion order.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.lock().get(collection).cloned().unwrap_or_default()
    }

    /// Makes every subsequent write to `collection` fail.
    pub fn reject_writes_to(&self, collection: &str) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(collection.to_string());
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Document>>> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self, collection: &str) -> Result<(), DbError> {
        let rejected = self.rejected.lock().unwrap_or_else(|e| e.into_inner());
        if rejected.contains(collection) {
            return Err(DbError::Rejected {
                collection: collection.to_string(),
                reason: "writes are disabled".to_string(),
            });
        }
        Ok(())
    }
}

fn ensure_id(doc: &mut Document) {
    if !doc.contains_key("_id") {
        doc.insert("_id", ObjectId::new());
    }
}

/// True when every key of `filter` is present in `doc` with an equal value.
fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, DbError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError> {
        let collections = self.lock();
        let docs = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches_filter(d, &filter)).cloned().collect())
            .unwrap_or_default();
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, DbError> {
        let collections = self.lock();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches_filter(d, &filter)).cloned()))
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DbError> {
        let collections = self.lock();
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches_filter(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson, DbError> {
        self.check_writable(collection)?;
        ensure_id(&mut document);
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError> {
        self.check_writable(collection)?;
        let mut collections = self.lock();
        let Some(target) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches_filter(d, &filter)))
        else {
            return Ok(UpdateOutcome::default());
        };

        let mut modified = false;
        for (key, value) in set {
            if target.get(&key) != Some(&value) {
                target.insert(key, value);
                modified = true;
            }
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn close(&self) -> Result<(), DbError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

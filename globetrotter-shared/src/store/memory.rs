/// In-process document store with optimistic concurrency control
///
/// Every document carries a version number. A [`MemoryTransaction`] keeps:
///
/// - the version of each document it read (0 when the document was absent)
/// - the result set (ID + version) of each equality query it ran
/// - the writes it buffered
///
/// On commit the store's write lock is taken, every read and query is
/// re-validated against the current state, and the buffered writes are
/// applied together. Any difference fails the commit with
/// [`StoreError::Conflict`]. This gives serializable behaviour for the
/// read-modify-write patterns the services use.
///
/// Used by the test suites and by the API server when
/// `STORE_BACKEND=memory`.

use super::{Document, DocumentKey, DocumentStore, StoreError, StoreResult, Transaction};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: JsonValue,
    version: i64,
}

/// Collections keyed by name, documents keyed by ID (ordered)
#[derive(Debug, Default)]
struct Collections {
    collections: HashMap<String, BTreeMap<String, StoredDocument>>,
}

impl Collections {
    fn get(&self, key: &DocumentKey) -> Option<&StoredDocument> {
        self.collections
            .get(&key.collection)
            .and_then(|docs| docs.get(&key.id))
    }

    fn version_of(&self, key: &DocumentKey) -> i64 {
        self.get(key).map(|doc| doc.version).unwrap_or(0)
    }

    fn put(&mut self, key: &DocumentKey, data: JsonValue) {
        let docs = self.collections.entry(key.collection.clone()).or_default();
        let version = docs.get(&key.id).map(|doc| doc.version).unwrap_or(0) + 1;
        docs.insert(key.id.clone(), StoredDocument { data, version });
    }

    fn snapshot(&self, key: &DocumentKey) -> Option<Document> {
        self.get(key).map(|doc| Document {
            key: key.clone(),
            data: doc.data.clone(),
            version: doc.version,
        })
    }

    fn query(&self, collection: &str, field: &str, value: &JsonValue) -> Vec<Document> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };

        docs.iter()
            .filter(|(_, doc)| doc.data.get(field) == Some(value))
            .map(|(id, doc)| Document {
                key: DocumentKey::new(collection, id.clone()),
                data: doc.data.clone(),
                version: doc.version,
            })
            .collect()
    }
}

/// Shared in-memory store
///
/// Cloning is cheap and clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection
    pub async fn count_documents(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        Ok(self.inner.read().await.snapshot(key))
    }

    async fn set(&self, key: &DocumentKey, data: JsonValue) -> StoreResult<()> {
        self.inner.write().await.put(key, data);
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>> {
        Ok(self.inner.read().await.query(collection, field, value))
    }

    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction::new(self.inner.clone())))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Recorded equality query, re-run at commit time
#[derive(Debug)]
struct QueryRead {
    collection: String,
    field: String,
    value: JsonValue,
    observed: Vec<(String, i64)>,
}

/// Optimistic transaction over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTransaction {
    inner: Arc<RwLock<Collections>>,
    reads: HashMap<DocumentKey, i64>,
    queries: Vec<QueryRead>,
    writes: BTreeMap<DocumentKey, JsonValue>,
    active: bool,
}

impl MemoryTransaction {
    fn new(inner: Arc<RwLock<Collections>>) -> Self {
        Self {
            inner,
            reads: HashMap::new(),
            queries: Vec::new(),
            writes: BTreeMap::new(),
            active: true,
        }
    }

    fn ensure_active(&self) -> StoreResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }

    fn validate(&self, current: &Collections) -> StoreResult<()> {
        for (key, seen) in &self.reads {
            let now = current.version_of(key);
            if now != *seen {
                return Err(StoreError::Conflict(format!(
                    "{} changed from version {} to {}",
                    key, seen, now
                )));
            }
        }

        for query in &self.queries {
            let now: Vec<(String, i64)> = current
                .query(&query.collection, &query.field, &query.value)
                .into_iter()
                .map(|doc| (doc.key.id, doc.version))
                .collect();
            if now != query.observed {
                return Err(StoreError::Conflict(format!(
                    "result of {} where {} == {} changed",
                    query.collection, query.field, query.value
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&mut self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        self.ensure_active()?;

        let doc = self.inner.read().await.snapshot(key);
        let version = doc.as_ref().map(|d| d.version).unwrap_or(0);
        self.reads.entry(key.clone()).or_insert(version);

        Ok(doc)
    }

    async fn find_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>> {
        self.ensure_active()?;

        let docs = self.inner.read().await.query(collection, field, value);
        self.queries.push(QueryRead {
            collection: collection.to_string(),
            field: field.to_string(),
            value: value.clone(),
            observed: docs
                .iter()
                .map(|doc| (doc.key.id.clone(), doc.version))
                .collect(),
        });

        Ok(docs)
    }

    fn set(&mut self, key: DocumentKey, data: JsonValue) {
        self.writes.insert(key, data);
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.ensure_active()?;
        self.active = false;

        let mut current = self.inner.write().await;
        self.validate(&current)?;

        for (key, data) in std::mem::take(&mut self.writes) {
            current.put(&key, data);
        }

        debug!(
            reads = self.reads.len(),
            queries = self.queries.len(),
            "Memory transaction committed"
        );
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.ensure_active()?;
        self.active = false;
        self.writes.clear();
        Ok(())
    }
}

/// Document store abstraction
///
/// GlobeTrotter persists everything as JSON documents grouped into
/// collections (`users`, `counters`, `trips`). This module defines the
/// contract every backend must honour:
///
/// - Single-document `get` / `set`
/// - Equality queries on a top-level field
/// - Multi-document transactions with optimistic conflict detection
///
/// # Backends
///
/// - [`memory::MemoryStore`]: in-process store with versioned documents
/// - [`postgres::PgDocumentStore`]: JSONB documents in PostgreSQL, run under
///   `SERIALIZABLE` isolation
///
/// # Transactions
///
/// Reads inside a [`Transaction`] go to the store immediately. Writes are
/// buffered and only become visible when [`Transaction::commit`] succeeds.
/// If another transaction modified anything this one read (including the
/// result set of a query), commit fails with [`StoreError::Conflict`] and
/// nothing is written. Dropping a transaction without committing discards
/// its writes.
///
/// # Example
///
/// ```
/// use globetrotter_shared::store::{memory::MemoryStore, DocumentKey, DocumentStore};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let key = DocumentKey::new("counters", "user_count");
///
/// let mut tx = store.begin().await?;
/// let current = tx.get(&key).await?;
/// assert!(current.is_none());
/// tx.set(key.clone(), json!({ "count": 1001 }));
/// tx.commit().await?;
///
/// let doc = store.get(&key).await?.expect("committed");
/// assert_eq!(doc.data["count"], 1001);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by document store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A concurrent transaction modified data this transaction depended on
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Transaction was already committed or rolled back
    #[error("Transaction is no longer active")]
    TransactionClosed,

    /// Document could not be converted to or from its typed form
    #[error("Malformed document {key}: {message}")]
    Malformed { key: String, message: String },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Returns true if retrying the whole transaction may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Address of a document: collection name plus document ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub collection: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document lives
    pub key: DocumentKey,

    /// Document body
    pub data: JsonValue,

    /// Version at read time, starts at 1 and grows on every write
    pub version: i64,
}

impl Document {
    /// Document ID within its collection
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Deserializes the document body into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| StoreError::Malformed {
            key: self.key.to_string(),
            message: e.to_string(),
        })
    }
}

/// Serializes a typed record into a document body
pub fn encode<T: Serialize>(key: &DocumentKey, value: &T) -> StoreResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| StoreError::Malformed {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// A backing store of JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs and health output
    fn backend(&self) -> &'static str;

    /// Reads a single document
    async fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Creates or replaces a single document outside any transaction
    async fn set(&self, key: &DocumentKey, data: JsonValue) -> StoreResult<()>;

    /// Returns every document in `collection` whose top-level `field` equals
    /// `value`, ordered by document ID as a string (byte-wise)
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>>;

    /// Opens a new transaction
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// An open multi-document transaction
#[async_trait]
pub trait Transaction: Send {
    /// Reads a document and records it in the read set
    async fn get(&mut self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Runs an equality query and records its result set
    async fn find_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> StoreResult<Vec<Document>>;

    /// Buffers a create-or-replace write, applied on commit
    fn set(&mut self, key: DocumentKey, data: JsonValue);

    /// Atomically applies buffered writes
    ///
    /// Fails with [`StoreError::Conflict`] if the read set is stale.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Discards buffered writes
    async fn rollback(&mut self) -> StoreResult<()>;
}

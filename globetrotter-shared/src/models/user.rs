/// User model and store operations
///
/// Users live in the `users` collection, one document per account, keyed by
/// the numeric ID allocated at signup (string-encoded, e.g. `"1001"`). The ID
/// is the document key and is not repeated inside the body.
///
/// # Document shape
///
/// ```json
/// {
///   "user_name": "jack",
///   "email": "jack@x.com",
///   "password": "$argon2id$v=19$...",
///   "created_at": "2025-01-01T00:00:00Z"
/// }
/// ```
///
/// `email` is unique across the collection. The signup service enforces
/// this inside its transaction; there is no index-level constraint.
///
/// # Example
///
/// ```no_run
/// use globetrotter_shared::models::user::User;
/// use globetrotter_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let matches = User::find_by_email(&store, "jack@x.com").await?;
/// if let Some(user) = matches.first() {
///     println!("Found user {} ({})", user.id, user.record.user_name);
/// }
/// # Ok(())
/// # }
/// ```

use crate::store::{encode, Document, DocumentKey, DocumentStore, StoreResult, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// Body of a user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name
    pub user_name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Stored credential: an Argon2 PHC string, or plaintext for legacy
    /// accounts
    pub password: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// A user document together with its ID
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Numeric user ID, string-encoded
    pub id: String,

    /// Document body
    pub record: UserRecord,
}

impl User {
    /// Document key for a user ID
    pub fn key(id: &str) -> DocumentKey {
        DocumentKey::new(USERS_COLLECTION, id)
    }

    /// Builds a typed user from a raw document
    pub fn from_document(doc: &Document) -> StoreResult<Self> {
        Ok(Self {
            id: doc.id().to_string(),
            record: doc.decode()?,
        })
    }

    /// Serializes the record for a write at [`User::key`]
    pub fn to_document_data(&self) -> StoreResult<JsonValue> {
        encode(&Self::key(&self.id), &self.record)
    }

    /// Looks up a user by ID
    pub async fn find_by_id(store: &dyn DocumentStore, id: &str) -> StoreResult<Option<Self>> {
        store
            .get(&Self::key(id))
            .await?
            .map(|doc| Self::from_document(&doc))
            .transpose()
    }

    /// Returns every user whose email matches exactly, ordered by ID as a string
    ///
    /// Normally zero or one result; more than one means the uniqueness
    /// invariant was broken by data written outside the signup path.
    pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> StoreResult<Vec<Self>> {
        store
            .find_by_field(USERS_COLLECTION, "email", &JsonValue::from(email))
            .await?
            .iter()
            .map(Self::from_document)
            .collect()
    }

    /// Same as [`User::find_by_email`] but recorded in a transaction's read
    /// set, so a concurrent insert with the same email fails the commit
    pub async fn find_by_email_in(
        tx: &mut dyn Transaction,
        email: &str,
    ) -> StoreResult<Vec<Self>> {
        tx.find_by_field(USERS_COLLECTION, "email", &JsonValue::from(email))
            .await?
            .iter()
            .map(Self::from_document)
            .collect()
    }
}

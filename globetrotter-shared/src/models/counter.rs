/// User ID counter
///
/// A single document at `counters/user_count` holds the last user ID handed
/// out:
///
/// ```json
/// { "count": 1002 }
/// ```
///
/// The document does not exist until the first signup commits. It is only
/// ever read and written inside the signup transaction, which is what keeps
/// allocation gap-free and duplicate-free under concurrency.

use crate::store::{encode, DocumentKey, StoreError, StoreResult, Transaction};
use serde::{Deserialize, Serialize};

/// Collection holding counter documents
pub const COUNTERS_COLLECTION: &str = "counters";

/// Document ID of the user counter
pub const USER_COUNTER_ID: &str = "user_count";

/// First ID allocated when the counter does not exist yet
pub const FIRST_USER_ID: i64 = 1001;

/// Body of the user counter document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounter {
    /// Last allocated user ID
    pub count: i64,
}

impl UserCounter {
    pub fn key() -> DocumentKey {
        DocumentKey::new(COUNTERS_COLLECTION, USER_COUNTER_ID)
    }

    /// ID that follows the current counter state
    ///
    /// # Errors
    ///
    /// `StoreError::Malformed` if the stored count cannot be incremented
    pub fn next_id(current: Option<UserCounter>) -> StoreResult<i64> {
        match current {
            Some(counter) => counter.count.checked_add(1).ok_or_else(|| StoreError::Malformed {
                key: Self::key().to_string(),
                message: format!("count {} cannot be incremented", counter.count),
            }),
            None => Ok(FIRST_USER_ID),
        }
    }

    /// Reads the counter inside a transaction
    pub async fn load(tx: &mut dyn Transaction) -> StoreResult<Option<Self>> {
        tx.get(&Self::key())
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Buffers a write of this counter value
    pub fn stage(&self, tx: &mut dyn Transaction) -> StoreResult<()> {
        let key = Self::key();
        let data = encode(&key, self)?;
        tx.set(key, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::MemoryStore, DocumentStore};

    #[test]
    fn test_next_id_starts_at_origin() {
        assert_eq!(UserCounter::next_id(None).unwrap(), 1001);
    }

    #[test]
    fn test_next_id_increments() {
        assert_eq!(UserCounter::next_id(Some(UserCounter { count: 1001 })).unwrap(), 1002);
        assert_eq!(UserCounter::next_id(Some(UserCounter { count: 4999 })).unwrap(), 5000);
    }

    #[test]
    fn test_next_id_at_upper_bound() {
        let err = UserCounter::next_id(Some(UserCounter { count: i64::MAX })).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert!(!err.is_conflict());
        assert!(err.to_string().contains("counters/user_count"));
    }

    #[tokio::test]
    async fn test_stage_and_load() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        assert!(UserCounter::load(tx.as_mut()).await.unwrap().is_none());
        UserCounter { count: 1001 }.stage(tx.as_mut()).unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let counter = UserCounter::load(tx.as_mut()).await.unwrap();
        assert_eq!(counter, Some(UserCounter { count: 1001 }));

        let doc = store.get(&UserCounter::key()).await.unwrap().unwrap();
        assert_eq!(doc.data, serde_json::json!({ "count": 1001 }));
    }
}

/// Trip model
///
/// Trips live in the `trips` collection keyed by the caller-supplied
/// `trip_id`. Writing a trip with an existing ID replaces it. A trip created
/// through `POST /trips/{user_id}` additionally records the owning user.

use crate::store::{encode, DocumentKey, DocumentStore, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection holding trip documents
pub const TRIPS_COLLECTION: &str = "trips";

/// One itinerary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub date: DateTime<Utc>,
    pub description: String,
    pub expense: f64,
    pub section_id: i64,
}

/// Trip fields supplied by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: i64,
    pub trip_name: String,
    pub place: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub photo_url: String,
    pub itinerary: Itinerary,
}

/// Stored trip document: client fields plus the optional owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(flatten)]
    pub trip: Trip,

    /// Owning user, set when created via the user-scoped endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TripRecord {
    pub fn new(trip: Trip, user_id: Option<String>) -> Self {
        Self { trip, user_id }
    }

    /// Document ID (the trip ID as a string)
    pub fn id(&self) -> String {
        self.trip.trip_id.to_string()
    }

    pub fn key(trip_id: &str) -> DocumentKey {
        DocumentKey::new(TRIPS_COLLECTION, trip_id)
    }

    /// Creates or replaces the trip document
    pub async fn save(&self, store: &dyn DocumentStore) -> StoreResult<()> {
        let key = Self::key(&self.id());
        let data = encode(&key, self)?;
        store.set(&key, data).await
    }

    pub async fn find_by_id(store: &dyn DocumentStore, trip_id: &str) -> StoreResult<Option<Self>> {
        store
            .get(&Self::key(trip_id))
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }
}

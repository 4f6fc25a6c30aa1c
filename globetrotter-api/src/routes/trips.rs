/// Trip endpoints
///
/// Trips are stored under their caller-supplied `trip_id`; posting a trip
/// with an ID that already exists replaces the stored trip.
///
/// # Endpoints
///
/// - `POST /trips` - Create or replace a trip
/// - `POST /trips/:user_id` - Same, linked to an existing user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use globetrotter_shared::models::{
    trip::{Trip, TripRecord},
    user::User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Response for `POST /trips`
#[derive(Debug, Serialize, Deserialize)]
pub struct TripResponse {
    pub status: String,

    /// Stored document ID (the trip ID)
    pub id: String,

    /// Trip as stored
    pub data: TripRecord,
}

/// Response for `POST /trips/:user_id`
#[derive(Debug, Serialize, Deserialize)]
pub struct UserTripResponse {
    pub status: String,
    pub id: String,
    pub linked_to_user: String,
    pub data: TripRecord,
}

/// Create a trip
///
/// # Endpoint
///
/// ```text
/// POST /trips
/// Content-Type: application/json
///
/// {
///   "trip_id": 1,
///   "trip_name": "Alps",
///   "place": "Zermatt",
///   "start_date": "2025-01-10T00:00:00Z",
///   "end_date": "2025-01-17T00:00:00Z",
///   "photo_url": "https://example.com/alps.jpg",
///   "itinerary": {
///     "date": "2025-01-10T09:00:00Z",
///     "description": "Arrive",
///     "expense": 120.5,
///     "section_id": 1
///   }
/// }
/// ```
///
/// # Errors
///
/// - `500 Internal Server Error`: Store error
pub async fn create_trip(
    State(state): State<AppState>,
    Json(trip): Json<Trip>,
) -> ApiResult<Json<TripResponse>> {
    let record = TripRecord::new(trip, None);
    record.save(state.store.as_ref()).await?;

    let id = record.id();
    info!(trip_id = %id, "Trip saved");

    Ok(Json(TripResponse {
        status: "success".to_string(),
        id,
        data: record,
    }))
}

/// Create a trip linked to a user
///
/// The user must exist; the trip is stored with its `user_id` set.
///
/// # Errors
///
/// - `404 Not Found`: No user with this ID
/// - `500 Internal Server Error`: Store error
pub async fn create_trip_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(trip): Json<Trip>,
) -> ApiResult<Json<UserTripResponse>> {
    if User::find_by_id(state.store.as_ref(), &user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let record = TripRecord::new(trip, Some(user_id.clone()));
    record.save(state.store.as_ref()).await?;

    let id = record.id();
    info!(trip_id = %id, user_id = %user_id, "Trip saved for user");

    Ok(Json(UserTripResponse {
        status: "success".to_string(),
        id,
        linked_to_user: user_id,
        data: record,
    }))
}

/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An app wired to a fresh in-memory store
/// - JSON request/response helpers

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use globetrotter_api::{
    app::{build_router, AppState},
    config::Config,
};
use globetrotter_shared::store::memory::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub app: Router,
}

impl TestContext {
    /// Creates a context with default configuration and an empty store
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Creates a context with configuration overrides
    pub fn with_env(vars: &[(&str, &str)]) -> Self {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
        .unwrap();

        let store = MemoryStore::new();
        let app = build_router(AppState::new(Arc::new(store.clone()), config));

        TestContext { store, app }
    }

    /// Sends a JSON POST and returns the status and parsed body
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Sends a GET and returns the status and parsed body
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };

        (status, json)
    }

    /// Signs up a user and returns the allocated ID
    pub async fn signup(&self, user_name: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/signup",
                serde_json::json!({
                    "user_name": user_name,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {}", body);

        body["user_id"].as_str().unwrap().to_string()
    }
}

/// A valid trip body with the given ID
pub fn sample_trip(trip_id: i64) -> Value {
    serde_json::json!({
        "trip_id": trip_id,
        "trip_name": "Alps",
        "place": "Zermatt",
        "start_date": "2025-01-10T00:00:00Z",
        "end_date": "2025-01-17T00:00:00Z",
        "photo_url": "https://example.com/alps.jpg",
        "itinerary": {
            "date": "2025-01-10T09:00:00Z",
            "description": "Arrive and check in",
            "expense": 120.5,
            "section_id": 1
        }
    })
}

/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use globetrotter_api::{app::AppState, config::Config};
/// use globetrotter_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = globetrotter_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use globetrotter_shared::{
    accounts::{
        login::LoginVerifier,
        signup::{SignupConfig, SignupTransactor},
    },
    store::DocumentStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Document store backing users, counters and trips
    pub store: Arc<dyn DocumentStore>,

    /// Signup service
    pub signup: SignupTransactor,

    /// Login service
    pub login: LoginVerifier,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state, wiring the account services to `store`
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        let signup = SignupTransactor::new(
            store.clone(),
            SignupConfig {
                max_attempts: config.accounts.signup_max_attempts,
                ..SignupConfig::default()
            },
        );
        let login = LoginVerifier::new(store.clone(), config.accounts.allow_plaintext_passwords);

        Self {
            store,
            signup,
            login,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # Health check
/// ├── POST /signup              # Create account, returns the new user ID
/// ├── POST /login               # Verify email/password
/// ├── POST /trips               # Create or replace a trip
/// └── POST /trips/:user_id      # Same, linked to an existing user
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new()
        .route("/health", get(routes::health::health_check));

    let account_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login));

    let trip_routes = Router::new()
        .route("/trips", post(routes::trips::create_trip))
        .route("/trips/:user_id", post(routes::trips::create_trip_for_user));

    let cors = cors_layer(&state.config.api.cors_origins);
    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .merge(account_routes)
        .merge(trip_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use globetrotter_shared::store::memory::MemoryStore;

    #[test]
    fn test_app_state_uses_configured_store() {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState::new(Arc::new(MemoryStore::new()), config);

        assert_eq!(state.store.backend(), "memory");
        assert_eq!(state.config.accounts.signup_max_attempts, 5);
    }
}

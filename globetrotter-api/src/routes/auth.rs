/// Account endpoints
///
/// This module provides the signup and login endpoints. Both are thin
/// wrappers over the account services in `globetrotter_shared::accounts`:
/// the handler validates the body, calls the service and maps its error
/// into an [`ApiError`].
///
/// # Endpoints
///
/// - `POST /signup` - Create an account with the next sequential user ID
/// - `POST /login` - Verify email and password

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use globetrotter_shared::accounts::signup::NewUser;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "User name must be 1-100 characters"))]
    pub user_name: String,

    /// Email address, unique across all accounts
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signup response
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    /// Always "success"
    pub status: String,

    /// Newly allocated user ID, e.g. "1001"
    pub user_id: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub message: String,
    pub user_id: String,
    pub user_name: String,
}

/// Register a new user
///
/// Allocates the next user ID (starting at 1001) and stores the account in
/// a single transaction.
///
/// # Endpoint
///
/// ```text
/// POST /signup
/// Content-Type: application/json
///
/// {
///   "user_name": "jack",
///   "email": "jackman01@gmail.com",
///   "password": "jack@1234"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "status": "success", "user_id": "1001" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Email already registered
/// - `409 Conflict`: Too many concurrent signups, retry
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: Server error
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    req.validate()?;

    let user_id = state
        .signup
        .signup(&NewUser {
            user_name: req.user_name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(SignupResponse {
        status: "success".to_string(),
        user_id,
    }))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// { "email": "jackman01@gmail.com", "password": "jack@1234" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "success",
///   "message": "Login successful",
///   "user_id": "1001",
///   "user_name": "jack"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Incorrect password
/// - `404 Not Found`: No account with this email
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = state.login.login(&req.email, &req.password).await?;
    info!(user_id = %user.user_id, "User logged in");

    Ok(Json(LoginResponse {
        status: "success".to_string(),
        message: "Login successful".to_string(),
        user_id: user.user_id,
        user_name: user.user_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_validation() {
        let valid = SignupRequest {
            user_name: "jack".to_string(),
            email: "jack@x.com".to_string(),
            password: "pw1".to_string(),
        };
        assert!(valid.validate().is_ok());

        let missing = SignupRequest {
            user_name: String::new(),
            email: String::new(),
            password: "pw1".to_string(),
        };
        let errors = missing.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("user_name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_login_request_validation() {
        let empty = LoginRequest {
            email: "jack@x.com".to_string(),
            password: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}

/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Account endpoints (signup, login)
/// - `trips`: Trip endpoints

pub mod health;
pub mod auth;
pub mod trips;

/// Document models for GlobeTrotter
///
/// Each model owns its collection name, document key scheme, and typed
/// body.
///
/// # Models
///
/// - `user`: user accounts (`users/{id}`)
/// - `counter`: the user ID counter (`counters/user_count`)
/// - `trip`: trips, optionally linked to a user (`trips/{trip_id}`)

pub mod counter;
pub mod trip;
pub mod user;

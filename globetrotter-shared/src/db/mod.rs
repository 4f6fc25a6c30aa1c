/// PostgreSQL plumbing for the `postgres` store backend
///
/// # Modules
///
/// - `pool`: connection pool creation with a startup health check
/// - `migrations`: embedded migrations creating the `documents` table
///
/// # Example
///
/// ```no_run
/// use globetrotter_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

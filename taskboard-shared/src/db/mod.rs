/// Postgres plumbing
///
/// # Modules
///
/// - `pool`: connection pool creation, health check and shutdown
/// - `migrations`: embedded schema migrations
///
/// Queries live next to their models in [`crate::models`]; the
/// [`crate::store::postgres::PgStore`] ties them together.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! yeti-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Relay migrations: `crates/relay/migrations/`

use charity_yeti_relay::store::{MIGRATOR, create_pool};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run relay database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database cannot be
/// reached, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("RELAY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("RELAY_DATABASE_URL"))?;

    tracing::info!("Connecting to relay database...");
    let pool = create_pool(&SecretString::from(database_url)).await?;

    tracing::info!("Running relay migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Relay migrations complete!");
    Ok(())
}

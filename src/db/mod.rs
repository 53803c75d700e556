//! PostgreSQL persistence layer
//!
//! Three tables back the questionnaire: `users_designer` (one row per user),
//! `data_questions` (one row per questionnaire run) and `user_answers`
//! (one row per stored answer). Repositories expose parameterized queries
//! over a shared [`PgPool`]; there is no ORM and no cache in between.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::DB_MAX_CONNECTIONS;

/// Answer row repository
pub mod answers;
/// Row structs mapped from query results
pub mod models;
/// Questionnaire request repository
pub mod requests;
/// User row repository
pub mod users;

/// Storage failures surfaced to the bot handlers
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying query failed
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// The user has no questionnaire request on file
    #[error("no questionnaire request on file for user {0}")]
    NoRequest(i64),
}

/// Open the shared connection pool
///
/// # Errors
///
/// Returns the underlying `sqlx` error when the database is unreachable.
pub async fn create_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect(url)
        .await
}

/// Apply the embedded schema migrations
///
/// # Errors
///
/// Returns a migration error when a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

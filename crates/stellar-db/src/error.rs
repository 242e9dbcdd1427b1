//! Error types for the persistence layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors and adds the failure
//! modes of turning rows back into domain types.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

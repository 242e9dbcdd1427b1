//! Error types for the server binary.
//!
//! [`AppError`] wraps every failure mode during startup so `main` can
//! propagate with `?`.

/// Top-level startup error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: stellar_core::ConfigError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: stellar_db::DbError,
    },

    /// The tick engine could not be built or started.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: stellar_core::EngineError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}

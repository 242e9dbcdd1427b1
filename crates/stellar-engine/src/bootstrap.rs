//! Startup wiring: configuration discovery, logging, and the choice of
//! seed source and tick sink.

use std::path::Path;
use std::sync::Arc;

use stellar_core::{EconomyConfig, LogFormat, SeedSource, StarterGalaxy, TickEngine, TickSink};
use stellar_db::{PgSeedSource, PgTickSink, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "stellar-config.yaml";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "STELLAR_CONFIG";

/// Load configuration from `path` if it exists, otherwise defaults.
///
/// Environment overrides apply either way.
pub fn load_config(path: &Path) -> Result<EconomyConfig, AppError> {
    if path.exists() {
        Ok(EconomyConfig::from_file(path)?)
    } else {
        Ok(EconomyConfig::from_env()?)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &EconomyConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| AppError::Logging {
            message: format!("invalid log filter: {e}"),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}

/// The engine plus whatever must be closed after it stops.
pub struct Assembled {
    /// The configured tick engine, not yet started.
    pub engine: Arc<TickEngine>,
    /// The database pool, when persistence is enabled.
    pub pool: Option<PostgresPool>,
}

/// Build the engine over `PostgreSQL` when a database URL is configured,
/// or over the built-in starter galaxy otherwise.
pub async fn assemble(config: EconomyConfig) -> Result<Assembled, AppError> {
    let Some(url) = config.infrastructure.database_url.clone() else {
        info!("No database configured, running the starter galaxy in memory");
        let engine = TickEngine::new(config, Arc::new(StarterGalaxy::new()))?;
        return Ok(Assembled {
            engine: Arc::new(engine),
            pool: None,
        });
    };

    let pool = PostgresPool::connect_url(&url).await?;
    pool.run_migrations().await?;
    info!("Database connected and migrated");

    let seed: Arc<dyn SeedSource> = Arc::new(PgSeedSource::new(pool.pool().clone()));
    let sink: Arc<dyn TickSink> = Arc::new(PgTickSink::new(pool.pool().clone()));
    let engine = TickEngine::new(config, seed)?.with_sink(sink);
    Ok(Assembled {
        engine: Arc::new(engine),
        pool: Some(pool),
    })
}

//! Configuration loading and typed config structures for the economy.
//!
//! The canonical configuration lives in `stellar-config.yaml` at the
//! deployment root. This module defines strongly-typed structs mirroring the
//! YAML structure, a loader, environment overrides, and validation. Every
//! field has a default, so an empty file (or no file) yields a runnable
//! configuration.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level economy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Tick cadence and snapshot retention.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Market pricing parameters.
    #[serde(default)]
    pub market: MarketConfig,

    /// World event triggering policy.
    #[serde(default)]
    pub events: EventConfig,

    /// Runtime mode and capability.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Database and HTTP endpoints.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EconomyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `infrastructure.database_url`
    /// - `OBSERVER_PORT` overrides `infrastructure.observer_port`
    /// - `STELLAR_MODE` overrides `runtime.mode`
    /// - `STELLAR_RUNTIME` overrides `runtime.capability`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides and validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Build the default configuration with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override produces an invalid
    /// value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a fixed map in tests). Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.infrastructure.database_url = Some(url);
        }
        if let Some(port) = lookup("OBSERVER_PORT").and_then(|p| p.parse().ok()) {
            self.infrastructure.observer_port = port;
        }
        if let Some(mode) = lookup("STELLAR_MODE").and_then(|m| RuntimeMode::parse(&m)) {
            self.runtime.mode = mode;
        }
        if let Some(capability) =
            lookup("STELLAR_RUNTIME").and_then(|c| RuntimeCapability::parse(&c))
        {
            self.runtime.capability = capability;
        }
    }

    /// Check every value is inside its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.tick_interval_ms == 0 {
            return Err(invalid("engine.tick_interval_ms", "must be at least 1"));
        }
        if self.engine.snapshot_interval_ticks == 0 {
            return Err(invalid("engine.snapshot_interval_ticks", "must be at least 1"));
        }
        if self.engine.max_snapshots == 0 {
            return Err(invalid("engine.max_snapshots", "must be at least 1"));
        }
        if self.market.reversion_rate <= Decimal::ZERO || self.market.reversion_rate > Decimal::ONE
        {
            return Err(invalid("market.reversion_rate", "must be in (0, 1]"));
        }
        if self.market.relaxation_rate < Decimal::ZERO || self.market.relaxation_rate > Decimal::ONE
        {
            return Err(invalid("market.relaxation_rate", "must be in [0, 1]"));
        }
        if self.market.min_price_factor <= Decimal::ZERO {
            return Err(invalid("market.min_price_factor", "must be positive"));
        }
        if self.market.max_price_factor < self.market.min_price_factor {
            return Err(invalid(
                "market.max_price_factor",
                "must not be below market.min_price_factor",
            ));
        }
        if self.events.trigger_chance_percent > 100 {
            return Err(invalid("events.trigger_chance_percent", "must be at most 100"));
        }
        if self.events.min_duration_ticks == 0 {
            return Err(invalid("events.min_duration_ticks", "must be at least 1"));
        }
        if self.events.max_duration_ticks < self.events.min_duration_ticks {
            return Err(invalid(
                "events.max_duration_ticks",
                "must not be below events.min_duration_ticks",
            ));
        }
        Ok(())
    }
}

/// Build a [`ConfigError::Invalid`].
fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

/// Tick cadence and snapshot retention.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineSettings {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capture a market snapshot every N ticks.
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,

    /// Maximum snapshots retained per system.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

impl EngineSettings {
    /// The tick period as a [`Duration`].
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_interval_ticks: default_snapshot_interval_ticks(),
            max_snapshots: default_max_snapshots(),
        }
    }
}

/// Market pricing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketConfig {
    /// Fraction of the gap to the target price closed each tick.
    #[serde(default = "default_reversion_rate")]
    pub reversion_rate: Decimal,

    /// Fraction of supply/demand imbalance that relaxes back to 1.0 each tick.
    #[serde(default = "default_relaxation_rate")]
    pub relaxation_rate: Decimal,

    /// Lowest price allowed, as a multiple of the base price.
    #[serde(default = "default_min_price_factor")]
    pub min_price_factor: Decimal,

    /// Highest price allowed, as a multiple of the base price.
    #[serde(default = "default_max_price_factor")]
    pub max_price_factor: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            reversion_rate: default_reversion_rate(),
            relaxation_rate: default_relaxation_rate(),
            min_price_factor: default_min_price_factor(),
            max_price_factor: default_max_price_factor(),
        }
    }
}

/// World event triggering policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventConfig {
    /// Seed for the deterministic event roll.
    #[serde(default = "default_event_seed")]
    pub seed: u64,

    /// Chance per tick (0-100) that a new event starts.
    #[serde(default = "default_trigger_chance_percent")]
    pub trigger_chance_percent: u32,

    /// Shortest event duration in ticks.
    #[serde(default = "default_min_duration_ticks")]
    pub min_duration_ticks: u64,

    /// Longest event duration in ticks.
    #[serde(default = "default_max_duration_ticks")]
    pub max_duration_ticks: u64,

    /// No new events start while this many are active.
    #[serde(default = "default_max_active_events")]
    pub max_active: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            seed: default_event_seed(),
            trigger_chance_percent: default_trigger_chance_percent(),
            min_duration_ticks: default_min_duration_ticks(),
            max_duration_ticks: default_max_duration_ticks(),
            max_active: default_max_active_events(),
        }
    }
}

/// Whether administrative operations are reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Local development: the admin surface is enabled.
    Development,
    /// Production: the admin surface always answers forbidden.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Parse a mode name (`development`/`dev`, `production`/`prod`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Whether this is the development mode.
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// The execution context a caller of `start()` is running in.
///
/// Only a long-lived server process may spawn the scheduling loop; build
/// steps, one-shot commands, and short-lived workers must not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeCapability {
    /// A long-lived server process.
    #[default]
    #[serde(alias = "server")]
    LongLivedServer,
    /// A short-lived or build-time execution context.
    #[serde(alias = "ephemeral")]
    ShortLived,
}

impl RuntimeCapability {
    /// Parse a capability name (`server`, `ephemeral`, or the full names).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "server" | "long_lived_server" => Some(Self::LongLivedServer),
            "ephemeral" | "short_lived" | "build" => Some(Self::ShortLived),
            _ => None,
        }
    }
}

/// Runtime mode and capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    /// Development or production.
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Whether this process may run the scheduling loop.
    #[serde(default)]
    pub capability: RuntimeCapability,
}

/// Database and HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection URL. `None` runs on the built-in starter galaxy.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Economy API bind host.
    #[serde(default = "default_observer_host")]
    pub observer_host: String,

    /// Economy API port.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            observer_host: default_observer_host(),
            observer_port: default_observer_port(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (required by serde's `default = "..."` attribute)
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    5000
}

const fn default_snapshot_interval_ticks() -> u64 {
    20
}

const fn default_max_snapshots() -> usize {
    50
}

fn default_reversion_rate() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_relaxation_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_min_price_factor() -> Decimal {
    Decimal::new(2, 1) // 0.2
}

fn default_max_price_factor() -> Decimal {
    Decimal::new(5, 0)
}

const fn default_event_seed() -> u64 {
    42
}

const fn default_trigger_chance_percent() -> u32 {
    5
}

const fn default_min_duration_ticks() -> u64 {
    12
}

const fn default_max_duration_ticks() -> u64 {
    60
}

const fn default_max_active_events() -> usize {
    8
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}

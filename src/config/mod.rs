//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::types::{OrderId, ProductId, TermId};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "instock-nav";
const ENV_PREFIX: &str = "INSTOCK_NAV";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
pub(crate) const DEFAULT_CACHE_KEY_PREFIX: &str = "wc_layered_nav_query_post_ids";
/// One week.
pub(crate) const DEFAULT_CACHE_TTL_SECS: u64 = 604_800;
/// Ten years.
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 315_360_000;
pub(crate) const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 4096;
pub(crate) const DEFAULT_CACHE_CONSUME_BATCH_LIMIT: usize = 100;
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 500;
pub(crate) const DEFAULT_MAX_PAGES: u32 = 1_000;
pub(crate) const DEFAULT_MAX_QUERY_SECS: u64 = 10;

/// Command-line arguments for the instock-nav binary.
#[derive(Debug, Parser)]
#[command(
    name = "instock-nav",
    version,
    about = "In-stock filtering for layered navigation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "INSTOCK_NAV_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the transient store backend (memory|postgres).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Filter candidate products for an attribute term.
    Filter(FilterArgs),
    /// Handle a stock change on a product or variation.
    #[command(name = "stock-set")]
    StockSet(ProductArgs),
    /// Handle a save of a product's variations.
    #[command(name = "variations-saved")]
    VariationsSaved(ProductArgs),
    /// Handle a product save.
    #[command(name = "product-saved")]
    ProductSaved(ProductArgs),
    /// Handle stock reduction for an order's line items.
    #[command(name = "order-reduced")]
    OrderReduced(OrderArgs),
    /// Clear every cached term after deactivation.
    Deactivate,
    /// Apply the bundled database migrations.
    Migrate,
}

#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    /// Attribute taxonomy, e.g. `pa_size`.
    #[arg(long, value_name = "TAXONOMY")]
    pub attribute: String,

    /// Selected term id.
    #[arg(long, value_name = "ID")]
    pub term: TermId,

    /// Candidate product ids, comma separated.
    #[arg(long, value_name = "IDS", value_delimiter = ',', num_args = 0..)]
    pub candidates: Vec<ProductId>,
}

#[derive(Debug, Args, Clone)]
pub struct ProductArgs {
    #[arg(long, value_name = "ID")]
    pub product: ProductId,
}

#[derive(Debug, Args, Clone)]
pub struct OrderArgs {
    #[arg(long, value_name = "ID")]
    pub order: OrderId,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub layered_nav: LayeredNavSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown backend `{other}`; expected memory or postgres")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub key_prefix: String,
    pub ttl: Duration,
    pub memory_capacity: NonZeroUsize,
    pub consume_batch_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct LayeredNavSettings {
    pub enabled: bool,
    pub page_size: NonZeroU32,
    pub max_pages: NonZeroU32,
    pub max_query_duration: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    layered_nav: RawLayeredNavSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            layered_nav,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            layered_nav: build_layered_nav_settings(layered_nav)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(value) => CacheBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackend::default(),
    };

    let key_prefix = cache
        .key_prefix
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string());
    if key_prefix.is_empty() {
        return Err(LoadError::invalid("cache.key_prefix", "must not be empty"));
    }

    let ttl_secs = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }
    if ttl_secs > MAX_CACHE_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            format!("must not exceed {MAX_CACHE_TTL_SECS}"),
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        backend,
        key_prefix,
        ttl: Duration::from_secs(ttl_secs),
        memory_capacity: non_zero_usize(
            cache
                .memory_capacity
                .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY as u64),
            "cache.memory_capacity",
        )?,
        consume_batch_limit: non_zero_usize(
            cache
                .consume_batch_limit
                .unwrap_or(DEFAULT_CACHE_CONSUME_BATCH_LIMIT as u64),
            "cache.consume_batch_limit",
        )?,
    })
}

fn build_layered_nav_settings(
    layered_nav: RawLayeredNavSettings,
) -> Result<LayeredNavSettings, LoadError> {
    let max_query_secs = layered_nav
        .max_query_seconds
        .unwrap_or(DEFAULT_MAX_QUERY_SECS);
    if max_query_secs == 0 {
        return Err(LoadError::invalid(
            "layered_nav.max_query_seconds",
            "must be greater than zero",
        ));
    }

    Ok(LayeredNavSettings {
        enabled: layered_nav.enabled.unwrap_or(true),
        page_size: non_zero_u32(
            layered_nav.page_size.unwrap_or(u64::from(DEFAULT_PAGE_SIZE)),
            "layered_nav.page_size",
        )?,
        max_pages: non_zero_u32(
            layered_nav.max_pages.unwrap_or(u64::from(DEFAULT_MAX_PAGES)),
            "layered_nav.max_pages",
        )?,
        max_query_duration: Duration::from_secs(max_query_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    backend: Option<String>,
    key_prefix: Option<String>,
    ttl_seconds: Option<u64>,
    memory_capacity: Option<u64>,
    consume_batch_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLayeredNavSettings {
    enabled: Option<bool>,
    page_size: Option<u64>,
    max_pages: Option<u64>,
    max_query_seconds: Option<u64>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;

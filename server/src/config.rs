// codcall_server/src/config.rs

use crate::errors::{AppError, Result};
use chrono::{FixedOffset, Local, Offset};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  /// Applies `schema.sql` on startup.
  pub apply_schema: bool,

  /// Upper bound on every outbound provider request and on pool acquisition.
  pub http_timeout: Duration,
  /// `None` disables the in-process tick.
  pub dispatch_interval: Option<Duration>,
  pub sync_interval: Option<Duration>,

  pub vapi_base_url: String,
  pub shopify_api_version: String,
  pub sync_lookback_days: i64,

  /// The single operating time zone business hours are evaluated in.
  pub utc_offset: FixedOffset,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_lookup(|name| env::var(name).ok())?;
    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      utc_offset = %config.utc_offset,
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  /// Builds the configuration from any variable source. Blank values count
  /// as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_env = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let or_default = |name: &str, default: &str| get_env(name).unwrap_or_else(|| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &or_default("SERVER_PORT", "8080"))?;
    let database_url =
      get_env("DATABASE_URL").ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let database_max_connections = parse_var::<u32>("DATABASE_MAX_CONNECTIONS", &or_default("DATABASE_MAX_CONNECTIONS", "5"))?;
    let apply_schema = parse_var::<bool>("APPLY_SCHEMA", &or_default("APPLY_SCHEMA", "false"))?;

    let http_timeout = Duration::from_secs(parse_var::<u64>("HTTP_TIMEOUT_SECS", &or_default("HTTP_TIMEOUT_SECS", "15"))?);
    let dispatch_interval = interval(parse_var::<u64>(
      "DISPATCH_INTERVAL_SECS",
      &or_default("DISPATCH_INTERVAL_SECS", "60"),
    )?);
    let sync_interval = interval(parse_var::<u64>("SYNC_INTERVAL_SECS", &or_default("SYNC_INTERVAL_SECS", "300"))?);

    let vapi_base_url = or_default("VAPI_BASE_URL", "https://api.vapi.ai").trim_end_matches('/').to_string();
    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-01");
    let sync_lookback_days = parse_var::<i64>("SYNC_LOOKBACK_DAYS", &or_default("SYNC_LOOKBACK_DAYS", "30"))?;
    if sync_lookback_days <= 0 {
      return Err(AppError::Config("SYNC_LOOKBACK_DAYS must be positive".to_string()));
    }

    let utc_offset = match get_env("UTC_OFFSET_MINUTES") {
      Some(raw) => {
        let minutes = parse_var::<i32>("UTC_OFFSET_MINUTES", &raw)?;
        FixedOffset::east_opt(minutes * 60)
          .ok_or_else(|| AppError::Config(format!("UTC_OFFSET_MINUTES out of range: {}", minutes)))?
      }
      None => Local::now().offset().fix(),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      apply_schema,
      http_timeout,
      dispatch_interval,
      sync_interval,
      vapi_base_url,
      shopify_api_version,
      sync_lookback_days,
      utc_offset,
    })
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

fn interval(secs: u64) -> Option<Duration> {
  (secs > 0).then(|| Duration::from_secs(secs))
}

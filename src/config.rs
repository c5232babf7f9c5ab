//! Environment-driven configuration
//!
//! Values come from the process environment (and `.env` via dotenvy when
//! the app starts). Every variable is optional and falls back to a default.

use std::env;
use std::str::FromStr;

use chrono::{Duration, FixedOffset};

use crate::error::{AppError, AppResult};
use crate::progression::ForecastConfig;
use crate::streak::{DEFAULT_GYM_REST_DAYS, DEFAULT_HORIZON_DAYS};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://fitlog.db?mode=rwc";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;
/// One day; cached ranges are keyed by date so anything longer is stale
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub database_url: String,
  pub cache_ttl_secs: u64,
  /// Per-cache entry limit (least recently used entries are evicted)
  pub cache_max_entries: usize,
  /// Streak horizon and history fetch window
  pub history_days: u32,
  pub gym_rest_days: u32,
  /// Offset of the user's local calendar from UTC
  pub utc_offset_minutes: i32,
  pub default_calorie_goal: Option<f64>,
  pub forecast: ForecastConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
      cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
      history_days: DEFAULT_HORIZON_DAYS,
      gym_rest_days: DEFAULT_GYM_REST_DAYS,
      utc_offset_minutes: 0,
      default_calorie_goal: None,
      forecast: ForecastConfig::default(),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> AppResult<Self> {
    let defaults = Self::default();
    let config = Self {
      database_url: env::var("FITLOG_DATABASE_URL").unwrap_or(defaults.database_url),
      cache_ttl_secs: parse_var("FITLOG_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl_secs),
      cache_max_entries: parse_var("FITLOG_CACHE_MAX_ENTRIES")?.unwrap_or(defaults.cache_max_entries),
      history_days: parse_var("FITLOG_HISTORY_DAYS")?.unwrap_or(defaults.history_days),
      gym_rest_days: parse_var("FITLOG_GYM_REST_DAYS")?.unwrap_or(defaults.gym_rest_days),
      utc_offset_minutes: parse_var("FITLOG_UTC_OFFSET_MINUTES")?.unwrap_or(defaults.utc_offset_minutes),
      default_calorie_goal: parse_var("FITLOG_DEFAULT_CALORIE_GOAL")?,
      forecast: defaults.forecast,
    };

    // Validates ranges up front
    config.utc_offset()?;
    config.cache_ttl()?;
    Ok(config)
  }

  pub fn utc_offset(&self) -> AppResult<FixedOffset> {
    FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
      AppError::Config(format!(
        "FITLOG_UTC_OFFSET_MINUTES out of range: {}",
        self.utc_offset_minutes
      ))
    })
  }

  pub fn cache_ttl(&self) -> AppResult<Duration> {
    let out_of_range = || {
      AppError::Config(format!(
        "FITLOG_CACHE_TTL_SECS must be at most {}: {}",
        MAX_CACHE_TTL_SECS, self.cache_ttl_secs
      ))
    };
    if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
      return Err(out_of_range());
    }
    let secs = i64::try_from(self.cache_ttl_secs).map_err(|_| out_of_range())?;
    Duration::try_seconds(secs).ok_or_else(out_of_range)
  }
}

fn parse_var<T: FromStr>(name: &str) -> AppResult<Option<T>> {
  match env::var(name) {
    Ok(raw) if raw.trim().is_empty() => Ok(None),
    Ok(raw) => raw
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| AppError::Config(format!("{} has invalid value '{}'", name, raw))),
    Err(_) => Ok(None),
  }
}

pub mod cache;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod progression;
pub mod store;
pub mod streak;

#[cfg(test)]
mod test_utils;

use tracing::{error, info};

use config::AppConfig;
use db::AppState;
use error::AppResult;

/// Load `.env`, install logging, open the database and build the shared state
pub async fn run() -> AppResult<AppState> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  logging::init_logging();

  let config = AppConfig::from_env().inspect_err(|e| error!(target: "fitlog", "invalid configuration: {}", e))?;
  init(config).await
}

/// Build the shared state from an explicit configuration
pub async fn init(config: AppConfig) -> AppResult<AppState> {
  let pool = db::initialize_db(&config.database_url).await?;
  let state = AppState::new(pool, config)?;
  info!(target: "fitlog", history_days = state.config.history_days, "fitlog ready");
  Ok(state)
}

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::store::ActivityStore;

pub type DbPool = SqlitePool;

/// Application state shared by the command layer
pub struct AppState {
  pub db: DbPool,
  pub store: ActivityStore,
  pub config: AppConfig,
}

impl AppState {
  pub fn new(db: DbPool, config: AppConfig) -> AppResult<Self> {
    let store = ActivityStore::new(db.clone(), &config)?;
    Ok(Self { db, store, config })
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> AppResult<DbPool> {
  info!(target: "fitlog::db", url = database_url, "initializing database");

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  info!(target: "fitlog::db", "database initialized");

  Ok(pool)
}

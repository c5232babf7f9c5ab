use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FoodEntry {
  pub id: i64,
  pub user_id: String,
  pub logged_at: DateTime<Utc>,
  pub calories: f64,
}

/// For inserting new food entries (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFoodEntry {
  pub user_id: String,
  pub logged_at: DateTime<Utc>,
  pub calories: f64,
}

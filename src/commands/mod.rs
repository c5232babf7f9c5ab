pub mod progression;
pub mod streak;

use tracing::info;

use crate::db::AppState;
use crate::error::AppResult;
use crate::models::{NewFoodEntry, NewWorkout};

/// Record a finished workout; returns its id
pub async fn log_workout(state: &AppState, workout: NewWorkout) -> AppResult<i64> {
  let id = state.store.log_workout(&workout).await?;
  info!(target: "fitlog::commands", user_id = %workout.user_id, workout_id = id, "workout logged");
  Ok(id)
}

pub async fn log_food_entry(state: &AppState, entry: NewFoodEntry) -> AppResult<i64> {
  state.store.log_food_entry(&entry).await
}

/// Set or clear the daily calorie goal used by nutrition streaks
pub async fn set_calorie_goal(state: &AppState, user_id: String, goal: Option<f64>) -> AppResult<()> {
  state.store.set_calorie_goal(&user_id, goal).await
}

//! Progression commands: load sessions for one exercise and forecast them

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::db::AppState;
use crate::error::AppResult;
use crate::progression::{ExerciseForecast, ProgressionForecaster, Timeframe};

/// Chart payload for one exercise over a timeframe ending `today`
pub async fn get_exercise_progression(
  state: &AppState,
  user_id: &str,
  exercise_id: i64,
  timeframe: Timeframe,
  today: NaiveDate,
) -> AppResult<ExerciseForecast> {
  let exercise = state.store.exercise(exercise_id).await?;
  let cutoff = timeframe.cutoff(today);

  let sessions = state.store.exercise_sessions(user_id, exercise_id, cutoff).await?;
  let target = state.store.exercise_target(user_id, exercise_id).await?;
  debug!(target: "fitlog::commands", exercise = %exercise.name, sessions = sessions.len(), ?target, "forecasting");

  let forecast = ProgressionForecaster::new(state.config.forecast).forecast(&sessions, exercise.kind(), cutoff, target);

  info!(
    target: "fitlog::commands",
    user_id,
    exercise_id,
    points = forecast.series.raw.len(),
    slope = forecast.trend.slope,
    "computed progression"
  );

  Ok(forecast)
}

/// Set or clear the manual target for an exercise
pub async fn set_exercise_target(
  state: &AppState,
  user_id: &str,
  exercise_id: i64,
  target: Option<f64>,
) -> AppResult<()> {
  // Fails with NotFound for unknown exercises
  state.store.exercise(exercise_id).await?;
  state.store.set_exercise_target(user_id, exercise_id, target).await
}

//! Streak commands: fetch history, then hand it to the streak engine

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::db::AppState;
use crate::error::AppResult;
use crate::streak::{summarize, StreakSummary};

/// Gym, nutrition and combined streaks for `user_id` as of `today`
/// (a date in the user's local calendar)
pub async fn get_streaks(state: &AppState, user_id: &str, today: NaiveDate) -> AppResult<StreakSummary> {
  let horizon = state.config.history_days;
  let from = today - Duration::days(i64::from(horizon));

  let workout_dates = state.store.workout_dates(user_id, from, today).await?;
  let daily_calories = state.store.daily_calories(user_id, from, today).await?;
  let calorie_goal = state
    .store
    .calorie_goal(user_id)
    .await?
    .or(state.config.default_calorie_goal);

  let summary = summarize(
    &workout_dates,
    &daily_calories,
    calorie_goal,
    state.config.gym_rest_days,
    horizon,
    today,
  );

  info!(
    target: "fitlog::commands",
    user_id,
    gym = summary.gym.current,
    nutrition = summary.nutrition.current,
    combined = summary.combined.current,
    "computed streaks"
  );

  Ok(summary)
}

/// Streaks as of the current day in the configured local calendar
pub async fn get_current_streaks(state: &AppState, user_id: &str) -> AppResult<StreakSummary> {
  get_streaks(state, user_id, state.store.local_today()).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::streak::StreakResult;
  use crate::test_utils::{date, seed_calorie_days, seed_workout_days, setup_test_db};

  async fn test_state(config: AppConfig) -> AppState {
    let pool = setup_test_db().await;
    AppState::new(pool, config).expect("state")
  }

  #[tokio::test]
  async fn test_get_streaks_end_to_end() {
    let state = test_state(AppConfig::default()).await;
    let today = date(2024, 5, 10);

    seed_workout_days(&state.store, "alice", today, &[0, 1, 3, 4]).await;
    seed_calorie_days(
      &state.store,
      "alice",
      &[(date(2024, 5, 8), 2100.0), (date(2024, 5, 9), 2050.0), (date(2024, 5, 10), 2300.0)],
    )
    .await;
    state.store.set_calorie_goal("alice", Some(2000.0)).await.expect("goal");

    let summary = get_streaks(&state, "alice", today).await.expect("streaks");
    assert_eq!(summary.as_of, today);
    assert_eq!(summary.gym, StreakResult { current: 5, best: 5, at_risk: false });
    assert_eq!(summary.nutrition.current, 3);
    assert_eq!(summary.combined.current, 2);
  }

  #[tokio::test]
  async fn test_get_streaks_new_user_is_zeroed() {
    let state = test_state(AppConfig::default()).await;
    let summary = get_streaks(&state, "nobody", date(2024, 5, 10)).await.expect("streaks");
    assert_eq!(summary.gym, StreakResult::default());
    assert_eq!(summary.nutrition, StreakResult::default());
    assert_eq!(summary.combined, StreakResult::default());
  }

  #[tokio::test]
  async fn test_default_goal_used_when_user_has_none() {
    let config = AppConfig {
      default_calorie_goal: Some(1800.0),
      ..AppConfig::default()
    };
    let state = test_state(config).await;
    let today = date(2024, 5, 10);
    seed_calorie_days(&state.store, "bob", &[(date(2024, 5, 9), 1900.0)]).await;

    let summary = get_streaks(&state, "bob", today).await.expect("streaks");
    assert_eq!(summary.nutrition.current, 1);
    assert!(summary.nutrition.at_risk, "nothing logged today yet");
  }

  #[tokio::test]
  async fn test_gym_rest_days_from_config() {
    let config = AppConfig {
      gym_rest_days: 0,
      ..AppConfig::default()
    };
    let state = test_state(config).await;
    let today = date(2024, 5, 10);
    seed_workout_days(&state.store, "alice", today, &[0, 1, 3, 4]).await;

    let summary = get_streaks(&state, "alice", today).await.expect("streaks");
    assert_eq!(summary.gym.current, 2);
    assert_eq!(summary.gym.best, 2);
  }

  #[tokio::test]
  async fn test_current_streaks_use_local_today() {
    let state = test_state(AppConfig::default()).await;
    let today = state.store.local_today();
    seed_workout_days(&state.store, "alice", today, &[0, 1]).await;

    let summary = get_current_streaks(&state, "alice").await.expect("streaks");
    assert_eq!(summary.as_of, today);
    assert_eq!(summary.gym.current, 2);
  }
}

//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for workouts, food and exercises
//! - Date fixtures
//! - Helper assertions

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::models::{NewExerciseEntry, NewFoodEntry, NewWorkout};
use crate::progression::{ExerciseType, SetType, WorkoutSet};
use crate::store::ActivityStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Log one workout per day offset (days before `today`, 10:00 UTC)
pub async fn seed_workout_days(store: &ActivityStore, user_id: &str, today: NaiveDate, days_ago: &[i64]) {
  for n in days_ago {
    let day = today - chrono::Duration::days(*n);
    store
      .log_workout(&NewWorkout {
        user_id: user_id.to_string(),
        started_at: day.and_hms_opt(10, 0, 0).expect("valid time").and_utc(),
        exercises: vec![],
      })
      .await
      .expect("Failed to seed workout");
  }
}

/// Log a day's calories as a single entry at 12:00 UTC
pub async fn seed_calorie_days(store: &ActivityStore, user_id: &str, days: &[(NaiveDate, f64)]) {
  for (day, calories) in days {
    store
      .log_food_entry(&NewFoodEntry {
        user_id: user_id.to_string(),
        logged_at: day.and_hms_opt(12, 0, 0).expect("valid time").and_utc(),
        calories: *calories,
      })
      .await
      .expect("Failed to seed food entry");
  }
}

/// Create a weighted exercise and log one working set per (date, kg)
pub async fn seed_weighted_sessions(store: &ActivityStore, user_id: &str, name: &str, sessions: &[(NaiveDate, f64)]) -> i64 {
  let exercise_id = store
    .create_exercise(name, ExerciseType::Weighted)
    .await
    .expect("Failed to seed exercise");

  for (day, kg) in sessions {
    store
      .log_workout(&NewWorkout {
        user_id: user_id.to_string(),
        started_at: day.and_hms_opt(9, 0, 0).expect("valid time").and_utc(),
        exercises: vec![NewExerciseEntry {
          exercise_id,
          sets: vec![mock_set(kg * 0.5, SetType::Warmup), mock_set(*kg, SetType::Normal)],
        }],
      })
      .await
      .expect("Failed to seed session");
  }

  exercise_id
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_set(kg: f64, set_type: SetType) -> WorkoutSet {
  WorkoutSet {
    kg: Some(kg),
    reps: Some(5),
    completed: true,
    set_type,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// UTC timestamp on the hour
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
    .single()
    .expect("valid timestamp")
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workouts', 'workout_sets', 'food_entries', 'exercise_targets')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_workout_days_inserts_rows() {
    let pool = setup_test_db().await;
    let store = ActivityStore::new(pool.clone(), &crate::config::AppConfig::default()).expect("store");

    seed_workout_days(&store, "alice", date(2024, 5, 10), &[0, 1, 3]).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workouts")
      .fetch_one(&pool)
      .await
      .expect("Failed to count workouts");
    assert_eq!(count, 3);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_time_helpers() {
    assert_eq!(at(2024, 1, 1, 10).date_naive(), date(2024, 1, 1));
    assert_eq!(date(2024, 2, 29).to_string(), "2024-02-29");
  }
}

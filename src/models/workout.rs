use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::{ExerciseType, WorkoutSet};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Exercise {
  pub id: i64,
  pub name: String,
  pub exercise_type: String,
}

impl Exercise {
  /// Unknown type strings fall back to weighted
  pub fn kind(&self) -> ExerciseType {
    self.exercise_type.parse().unwrap_or(ExerciseType::Weighted)
  }
}

/// One set joined with the workout it belongs to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SetRow {
  pub workout_exercise_id: i64,
  pub started_at: DateTime<Utc>,
  pub kg: Option<f64>,
  pub reps: Option<i64>,
  pub completed: bool,
  pub set_type: String,
}

/// For inserting a finished workout (without ids)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkout {
  pub user_id: String,
  pub started_at: DateTime<Utc>,
  pub exercises: Vec<NewExerciseEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExerciseEntry {
  pub exercise_id: i64,
  pub sets: Vec<WorkoutSet>,
}

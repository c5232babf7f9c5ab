//! Activity store: the date-range queries the streak and forecast core
//! depend on, backed by SQLite.
//!
//! Timestamps are stored in UTC and bucketed into calendar days using the
//! configured fixed offset. Date-range results are cached briefly per user;
//! every write for a user drops that user's cached ranges.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Exercise, FoodEntry, NewFoodEntry, NewWorkout, SetRow};
use crate::progression::{ExerciseSession, ExerciseType, SetType, WorkoutSet};
use crate::streak::DailyMetric;

/// (user, first day, last day), both days inclusive
type RangeKey = (String, NaiveDate, NaiveDate);

pub struct ActivityStore {
  pool: DbPool,
  offset: FixedOffset,
  workout_dates_cache: TtlCache<RangeKey, BTreeSet<NaiveDate>>,
  calories_cache: TtlCache<RangeKey, DailyMetric>,
}

impl ActivityStore {
  pub fn new(pool: DbPool, config: &AppConfig) -> AppResult<Self> {
    let ttl = config.cache_ttl()?;
    Ok(Self {
      pool,
      offset: config.utc_offset()?,
      workout_dates_cache: TtlCache::new(ttl, config.cache_max_entries),
      calories_cache: TtlCache::new(ttl, config.cache_max_entries),
    })
  }

  // ---------------------------------------------------------------------------
  // Calendar helpers
  // ---------------------------------------------------------------------------

  /// Calendar day of a timestamp in the user's local calendar
  pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&self.offset).date_naive()
  }

  pub fn local_today(&self) -> NaiveDate {
    self.local_date(Utc::now())
  }

  /// UTC instant at which a local calendar day starts
  fn local_midnight_utc(&self, date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(self.offset.local_minus_utc()))))
  }

  /// Half-open UTC bounds covering `from..=to` local days
  fn utc_bounds(&self, from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (self.local_midnight_utc(from), self.local_midnight_utc(to) + Duration::days(1))
  }

  // ---------------------------------------------------------------------------
  // Streak inputs
  // ---------------------------------------------------------------------------

  /// Days in `from..=to` with at least one workout
  pub async fn workout_dates(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> AppResult<BTreeSet<NaiveDate>> {
    let key = (user_id.to_string(), from, to);
    if let Some(hit) = self.workout_dates_cache.get(&key) {
      debug!(target: "fitlog::store::cache", user_id, "workout dates cache hit");
      return Ok(hit);
    }

    let (start, end) = self.utc_bounds(from, to);
    let started: Vec<DateTime<Utc>> = sqlx::query_scalar(
      "SELECT started_at FROM workouts WHERE user_id = ?1 AND started_at >= ?2 AND started_at < ?3",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;

    let dates: BTreeSet<NaiveDate> = started
      .into_iter()
      .map(|ts| self.local_date(ts))
      .filter(|d| *d >= from && *d <= to)
      .collect();

    debug!(target: "fitlog::store", user_id, days = dates.len(), "loaded workout dates");
    self.workout_dates_cache.insert(key, dates.clone());
    Ok(dates)
  }

  /// Calories summed per local day in `from..=to`
  pub async fn daily_calories(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> AppResult<DailyMetric> {
    let key = (user_id.to_string(), from, to);
    if let Some(hit) = self.calories_cache.get(&key) {
      debug!(target: "fitlog::store::cache", user_id, "daily calories cache hit");
      return Ok(hit);
    }

    let (start, end) = self.utc_bounds(from, to);
    let entries: Vec<FoodEntry> = sqlx::query_as(
      "SELECT id, user_id, logged_at, calories FROM food_entries
       WHERE user_id = ?1 AND logged_at >= ?2 AND logged_at < ?3",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;

    let metric = DailyMetric::from_entries(
      entries
        .iter()
        .map(|e| (self.local_date(e.logged_at), e.calories))
        .filter(|(d, _)| *d >= from && *d <= to),
    );

    debug!(target: "fitlog::store", user_id, days = metric.len(), "loaded daily calories");
    self.calories_cache.insert(key, metric.clone());
    Ok(metric)
  }

  pub async fn calorie_goal(&self, user_id: &str) -> AppResult<Option<f64>> {
    let goal: Option<Option<f64>> = sqlx::query_scalar("SELECT calorie_goal FROM user_goals WHERE user_id = ?1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(goal.flatten())
  }

  pub async fn set_calorie_goal(&self, user_id: &str, goal: Option<f64>) -> AppResult<()> {
    if goal.is_some_and(|g| g <= 0.0 || !g.is_finite()) {
      return Err(AppError::InvalidInput("calorie goal must be positive".into()));
    }

    sqlx::query(
      r#"
      INSERT INTO user_goals (user_id, calorie_goal) VALUES (?1, ?2)
      ON CONFLICT(user_id) DO UPDATE SET calorie_goal = excluded.calorie_goal
      "#,
    )
    .bind(user_id)
    .bind(goal)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Forecast inputs
  // ---------------------------------------------------------------------------

  pub async fn create_exercise(&self, name: &str, exercise_type: ExerciseType) -> AppResult<i64> {
    let result = sqlx::query("INSERT INTO exercises (name, exercise_type) VALUES (?1, ?2)")
      .bind(name)
      .bind(exercise_type.to_string())
      .execute(&self.pool)
      .await?;
    Ok(result.last_insert_rowid())
  }

  pub async fn exercise(&self, exercise_id: i64) -> AppResult<Exercise> {
    sqlx::query_as::<_, Exercise>("SELECT id, name, exercise_type FROM exercises WHERE id = ?1")
      .bind(exercise_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("exercise {}", exercise_id)))
  }

  /// Sessions of one exercise, oldest first, optionally only from `since` on
  pub async fn exercise_sessions(
    &self,
    user_id: &str,
    exercise_id: i64,
    since: Option<NaiveDate>,
  ) -> AppResult<Vec<ExerciseSession>> {
    let since_utc = since.map(|d| self.local_midnight_utc(d));
    let rows: Vec<SetRow> = sqlx::query_as(
      r#"
      SELECT we.id AS workout_exercise_id, w.started_at, s.kg, s.reps, s.completed, s.set_type
      FROM workout_sets s
      JOIN workout_exercises we ON we.id = s.workout_exercise_id
      JOIN workouts w ON w.id = we.workout_id
      WHERE w.user_id = ?1 AND we.exercise_id = ?2 AND (?3 IS NULL OR w.started_at >= ?3)
      ORDER BY w.started_at, we.id, s.set_index
      "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(since_utc)
    .fetch_all(&self.pool)
    .await?;

    let mut sessions: Vec<ExerciseSession> = Vec::new();
    let mut current_id: Option<i64> = None;

    for row in rows {
      let set_type = row.set_type.parse().unwrap_or_else(|e: String| {
        warn!(target: "fitlog::store", error = %e, "treating unknown set type as normal");
        SetType::Normal
      });
      let set = WorkoutSet {
        kg: row.kg,
        reps: row.reps,
        completed: row.completed,
        set_type,
      };

      if current_id == Some(row.workout_exercise_id) {
        if let Some(session) = sessions.last_mut() {
          session.sets.push(set);
          continue;
        }
      }

      current_id = Some(row.workout_exercise_id);
      sessions.push(ExerciseSession {
        date: self.local_date(row.started_at),
        sets: vec![set],
      });
    }

    debug!(target: "fitlog::store", user_id, exercise_id, sessions = sessions.len(), "loaded exercise sessions");
    Ok(sessions)
  }

  pub async fn exercise_target(&self, user_id: &str, exercise_id: i64) -> AppResult<Option<f64>> {
    let target: Option<f64> = sqlx::query_scalar("SELECT target_value FROM exercise_targets WHERE user_id = ?1 AND exercise_id = ?2")
      .bind(user_id)
      .bind(exercise_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(target)
  }

  /// Persist a manual target; `None` clears it
  pub async fn set_exercise_target(&self, user_id: &str, exercise_id: i64, target: Option<f64>) -> AppResult<()> {
    match target {
      Some(value) if value <= 0.0 || !value.is_finite() => {
        Err(AppError::InvalidInput("target must be positive".into()))
      }
      Some(value) => {
        sqlx::query(
          r#"
          INSERT INTO exercise_targets (user_id, exercise_id, target_value, updated_at)
          VALUES (?1, ?2, ?3, ?4)
          ON CONFLICT(user_id, exercise_id) DO UPDATE SET
            target_value = excluded.target_value,
            updated_at = excluded.updated_at
          "#,
        )
        .bind(user_id)
        .bind(exercise_id)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
      }
      None => {
        sqlx::query("DELETE FROM exercise_targets WHERE user_id = ?1 AND exercise_id = ?2")
          .bind(user_id)
          .bind(exercise_id)
          .execute(&self.pool)
          .await?;
        Ok(())
      }
    }
  }

  // ---------------------------------------------------------------------------
  // Writes
  // ---------------------------------------------------------------------------

  /// Insert a workout with its exercises and sets; returns the workout id
  pub async fn log_workout(&self, workout: &NewWorkout) -> AppResult<i64> {
    let mut tx = self.pool.begin().await?;

    let workout_id = sqlx::query("INSERT INTO workouts (user_id, started_at) VALUES (?1, ?2)")
      .bind(&workout.user_id)
      .bind(workout.started_at)
      .execute(&mut *tx)
      .await?
      .last_insert_rowid();

    for (position, entry) in workout.exercises.iter().enumerate() {
      let workout_exercise_id =
        sqlx::query("INSERT INTO workout_exercises (workout_id, exercise_id, position) VALUES (?1, ?2, ?3)")
          .bind(workout_id)
          .bind(entry.exercise_id)
          .bind(position as i64)
          .execute(&mut *tx)
          .await?
          .last_insert_rowid();

      for (set_index, set) in entry.sets.iter().enumerate() {
        sqlx::query(
          r#"
          INSERT INTO workout_sets (workout_exercise_id, set_index, kg, reps, completed, set_type)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6)
          "#,
        )
        .bind(workout_exercise_id)
        .bind(set_index as i64)
        .bind(set.kg)
        .bind(set.reps)
        .bind(set.completed)
        .bind(set.set_type.to_string())
        .execute(&mut *tx)
        .await?;
      }
    }

    tx.commit().await?;
    self.invalidate_user(&workout.user_id);
    Ok(workout_id)
  }

  pub async fn log_food_entry(&self, entry: &NewFoodEntry) -> AppResult<i64> {
    if entry.calories < 0.0 || !entry.calories.is_finite() {
      return Err(AppError::InvalidInput("calories must be zero or more".into()));
    }

    let id = sqlx::query("INSERT INTO food_entries (user_id, logged_at, calories) VALUES (?1, ?2, ?3)")
      .bind(&entry.user_id)
      .bind(entry.logged_at)
      .bind(entry.calories)
      .execute(&self.pool)
      .await?
      .last_insert_rowid();

    self.invalidate_user(&entry.user_id);
    Ok(id)
  }

  /// Drop every cached range for one user
  pub fn invalidate_user(&self, user_id: &str) {
    let dropped = self.workout_dates_cache.invalidate_where(|(u, _, _)| u == user_id)
      + self.calories_cache.invalidate_where(|(u, _, _)| u == user_id);
    if dropped > 0 {
      debug!(target: "fitlog::store::cache", user_id, dropped, "invalidated cached ranges");
    }
  }
}

//! Progressive-Overload Forecaster
//!
//! Turns a chronological list of exercise sessions into:
//! - raw best-effort points (one per session)
//! - a rolling-best smoothed series
//! - a least-squares trend and a damped short-horizon projection
//! - a confidence estimate for reaching a target
//! - a load recommendation (increase / hold / decrease)
//!
//! Key principles:
//! - Pure functions over already-fetched sessions, no I/O
//! - Too little history is a normal state: None / empty, never an error
//! - Every tuning constant lives in `ForecastConfig`

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
/// Exercise Type: which set field carries the effort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    /// Load in kg
    Weighted,
    /// Reps
    Bodyweight,
    /// Elapsed seconds, stored in the reps field
    Duration,
    /// Added load in kg
    WeightedBodyweight,
}

impl ExerciseType {
    pub fn uses_load(&self) -> bool {
        matches!(self, Self::Weighted | Self::WeightedBodyweight)
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weighted => write!(f, "weighted"),
            Self::Bodyweight => write!(f, "bodyweight"),
            Self::Duration => write!(f, "duration"),
            Self::WeightedBodyweight => write!(f, "weighted_bodyweight"),
        }
    }
}

impl std::str::FromStr for ExerciseType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted" => Ok(Self::Weighted),
            "bodyweight" => Ok(Self::Bodyweight),
            "duration" => Ok(Self::Duration),
            "weighted_bodyweight" => Ok(Self::WeightedBodyweight),
            _ => Err(format!("Unknown exercise type: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// Set Type: warm-up and drop sets never count as best effort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    #[default]
    Normal,
    Warmup,
    Drop,
    Failure,
}

impl std::fmt::Display for SetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Warmup => write!(f, "warmup"),
            Self::Drop => write!(f, "drop"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

impl std::str::FromStr for SetType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "warmup" => Ok(Self::Warmup),
            "drop" => Ok(Self::Drop),
            "failure" => Ok(Self::Failure),
            _ => Err(format!("Unknown set type: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// Session input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub kg: Option<f64>,
    pub reps: Option<i64>,
    pub completed: bool,
    pub set_type: SetType,
}

impl WorkoutSet {
    /// Completed and not a warm-up or drop set
    pub fn is_working(&self) -> bool {
        self.completed && !matches!(self.set_type, SetType::Warmup | SetType::Drop)
    }

    fn effort(&self, exercise_type: ExerciseType) -> f64 {
        if exercise_type.uses_load() {
            self.kg.unwrap_or(0.0)
        } else {
            self.reps.unwrap_or(0) as f64
        }
    }
}

/// One exercise performed in one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub date: NaiveDate,
    pub sets: Vec<WorkoutSet>,
}

// ---------------------------------------------------------------------------
/// Forecast output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SessionPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Raw and smoothed points share length and dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSeries {
    pub raw: Vec<SessionPoint>,
    pub smoothed: Vec<SessionPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendModel {
    /// Value on the regression line at a session index
    pub fn value_at(&self, index: f64) -> f64 {
        self.slope * index + self.intercept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// 100 is reserved for "already reached"
    pub percent: u8,
    pub sessions_to_target: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadAction {
    Increase,
    Hold,
    Decrease,
}

impl std::fmt::Display for LoadAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increase => write!(f, "increase"),
            Self::Hold => write!(f, "hold"),
            Self::Decrease => write!(f, "decrease"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: LoadAction,
    pub suggested_value: f64,
}

/// Everything the progression chart needs for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseForecast {
    pub exercise_type: ExerciseType,
    pub series: ProgressionSeries,
    pub trend: TrendModel,
    pub projection: Vec<SessionPoint>,
    pub prediction: Option<Prediction>,
    pub recommendation: Option<Recommendation>,
    pub personal_best: Option<f64>,
}

// ---------------------------------------------------------------------------
/// Timeframe: how far back the chart looks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Week,
    TwoWeeks,
    #[default]
    Month,
    Quarter,
    HalfYear,
    All,
}

impl Timeframe {
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::Week => Some(7),
            Self::TwoWeeks => Some(14),
            Self::Month => Some(30),
            Self::Quarter => Some(90),
            Self::HalfYear => Some(180),
            Self::All => None,
        }
    }

    /// Earliest session date kept (None = keep everything)
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.days().map(|d| today - Duration::days(d))
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" | "week" => Ok(Self::Week),
            "14d" | "two_weeks" => Ok(Self::TwoWeeks),
            "30d" | "month" => Ok(Self::Month),
            "90d" | "quarter" => Ok(Self::Quarter),
            "180d" | "half_year" => Ok(Self::HalfYear),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown timeframe: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// Forecast Config: empirical tuning constants
// ---------------------------------------------------------------------------

/// Slope thresholds and multipliers for the load recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    pub strong_increase_slope: f64,
    pub increase_slope: f64,
    pub hold_slope: f64,
    pub strong_increase_step: f64,
    pub increase_step: f64,
    pub deload_step: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            strong_increase_slope: 1.5,
            increase_slope: 0.3,
            hold_slope: -0.5,
            strong_increase_step: 1.05,
            increase_step: 1.025,
            deload_step: 0.9,
        }
    }
}

/// Constants behind the target-attainment percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    pub base: f64,
    pub span: f64,
    pub cap: f64,
    /// Slope that fully closes this fraction of the gap per session scores 1.0
    pub gap_scale: f64,
    pub flat_base: f64,
    pub flat_slope_penalty: f64,
    pub floor: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base: 35.0,
            span: 55.0,
            cap: 95.0,
            gap_scale: 0.05,
            flat_base: 15.0,
            flat_slope_penalty: 10.0,
            floor: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub smoothing_window: usize,
    pub sessions_ahead: usize,
    /// Per-session shrink of the projected delta
    pub damping_per_session: f64,
    /// Projections never drop below this share of the last value
    pub projection_floor_ratio: f64,
    pub min_gap_days: f64,
    pub recommendation: RecommendationPolicy,
    pub confidence: ConfidencePolicy,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            sessions_ahead: 4,
            damping_per_session: 0.05,
            projection_floor_ratio: 0.95,
            min_gap_days: 3.0,
            recommendation: RecommendationPolicy::default(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
/// Progression Forecaster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressionForecaster {
    pub config: ForecastConfig,
}

impl ProgressionForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Best working-set effort per session on or after `cutoff`, oldest first
    pub fn extract_best_per_session(
        &self,
        sessions: &[ExerciseSession],
        exercise_type: ExerciseType,
        cutoff: Option<NaiveDate>,
    ) -> Vec<SessionPoint> {
        let mut points: Vec<SessionPoint> = sessions
            .iter()
            .filter(|s| cutoff.map_or(true, |c| s.date >= c))
            .filter_map(|s| {
                let best = s
                    .sets
                    .iter()
                    .filter(|set| set.is_working())
                    .map(|set| set.effort(exercise_type))
                    .fold(0.0_f64, f64::max);
                (best > 0.0).then(|| SessionPoint::new(s.date, best))
            })
            .collect();

        points.sort_by_key(|p| p.date);
        points
    }

    /// Rolling best over the trailing window, never below the day's own value
    pub fn smooth(&self, raw: &[SessionPoint], window: usize) -> Vec<SessionPoint> {
        let window = window.max(1);
        raw.iter()
            .enumerate()
            .map(|(i, point)| {
                let start = (i + 1).saturating_sub(window);
                let best = raw[start..=i].iter().map(|p| p.value).fold(point.value, f64::max);
                SessionPoint::new(point.date, best)
            })
            .collect()
    }

    /// Ordinary least squares of value on 0-based session index
    pub fn fit_trend(&self, points: &[SessionPoint]) -> TrendModel {
        if points.len() < 2 {
            return TrendModel {
                slope: 0.0,
                intercept: points.first().map_or(0.0, |p| p.value),
            };
        }

        let n = points.len() as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (i, p) in points.iter().enumerate() {
            let x = i as f64;
            sum_x += x;
            sum_y += p.value;
            sum_xy += x * p.value;
            sum_xx += x * x;
        }

        let denominator = n * sum_xx - sum_x * sum_x;
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;

        TrendModel { slope, intercept }
    }

    /// Damped linear projection of the next `sessions_ahead` sessions
    pub fn project_future(&self, points: &[SessionPoint], sessions_ahead: usize) -> Vec<SessionPoint> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Vec::new();
        };
        if points.len() < 3 {
            return Vec::new();
        }

        let trend = self.fit_trend(points);
        let last_index = (points.len() - 1) as f64;
        let elapsed_days = (last.date - first.date).num_days() as f64;
        let avg_gap_days = (elapsed_days / last_index).max(self.config.min_gap_days);
        let floor = (last.value * self.config.projection_floor_ratio).ceil();

        (1..=sessions_ahead)
            .map(|i| {
                let step = i as f64;
                let date = last.date + Duration::days((step * avg_gap_days).round() as i64);
                let projected = trend.value_at(last_index + step);
                let damping = (1.0 - self.config.damping_per_session * step).max(0.0);
                let damped = last.value + (projected - last.value) * damping;
                SessionPoint::new(date, damped.round().max(floor))
            })
            .collect()
    }

    /// Chance of reaching `target` given the current trend
    pub fn predict_target_attainment(&self, points: &[SessionPoint], target: f64) -> Option<Prediction> {
        if points.len() < 3 || target <= 0.0 {
            return None;
        }

        let current = points.last()?.value;
        if current >= target {
            return Some(Prediction {
                percent: 100,
                sessions_to_target: Some(0),
            });
        }

        let policy = &self.config.confidence;
        let slope = self.fit_trend(points).slope;

        if slope <= 0.0 {
            let percent = (policy.flat_base - slope.abs() * policy.flat_slope_penalty)
                .round()
                .max(policy.floor);
            return Some(Prediction {
                percent: percent.min(100.0) as u8,
                sessions_to_target: None,
            });
        }

        let gap = target - current;
        let sessions_needed = (gap / slope).ceil() as u32;
        let raw_confidence = (slope / (gap * policy.gap_scale)).min(1.0);
        let percent = (policy.base + raw_confidence * policy.span)
            .round()
            .clamp(policy.floor, policy.cap);

        Some(Prediction {
            percent: percent as u8,
            sessions_to_target: Some(sessions_needed),
        })
    }

    /// Next working load from the recent trend.
    ///
    /// The slope comes from the smoothed series once it has three points,
    /// otherwise from the raw points.
    pub fn recommend_load(&self, smoothed: &[SessionPoint], raw: &[SessionPoint]) -> Option<Recommendation> {
        if raw.len() < 2 {
            return None;
        }

        let last_raw = raw.last()?.value;
        let slope = if smoothed.len() >= 3 {
            self.fit_trend(smoothed).slope
        } else {
            self.fit_trend(raw).slope
        };

        let policy = &self.config.recommendation;
        let (action, factor) = if slope > policy.strong_increase_slope {
            (LoadAction::Increase, policy.strong_increase_step)
        } else if slope > policy.increase_slope {
            (LoadAction::Increase, policy.increase_step)
        } else if slope > policy.hold_slope {
            (LoadAction::Hold, 1.0)
        } else {
            (LoadAction::Decrease, policy.deload_step)
        };

        Some(Recommendation {
            action,
            suggested_value: (last_raw * factor).round(),
        })
    }

    /// Full chart payload for one exercise
    pub fn forecast(
        &self,
        sessions: &[ExerciseSession],
        exercise_type: ExerciseType,
        cutoff: Option<NaiveDate>,
        target: Option<f64>,
    ) -> ExerciseForecast {
        let raw = self.extract_best_per_session(sessions, exercise_type, cutoff);
        let smoothed = self.smooth(&raw, self.config.smoothing_window);

        let trend = self.fit_trend(&smoothed);
        let projection = self.project_future(&smoothed, self.config.sessions_ahead);
        let prediction = target.and_then(|t| self.predict_target_attainment(&smoothed, t));
        let recommendation = self.recommend_load(&smoothed, &raw);
        let personal_best = raw.iter().map(|p| p.value).reduce(f64::max);

        ExerciseForecast {
            exercise_type,
            series: ProgressionSeries { raw, smoothed },
            trend,
            projection,
            prediction,
            recommendation,
            personal_best,
        }
    }
}

// ---------------------------------------------------------------------------
/// Default-config shorthands
// ---------------------------------------------------------------------------

pub fn extract_best_per_session(
    sessions: &[ExerciseSession],
    exercise_type: ExerciseType,
    cutoff: Option<NaiveDate>,
) -> Vec<SessionPoint> {
    ProgressionForecaster::default().extract_best_per_session(sessions, exercise_type, cutoff)
}

pub fn smooth(raw: &[SessionPoint], window: usize) -> Vec<SessionPoint> {
    ProgressionForecaster::default().smooth(raw, window)
}

pub fn fit_trend(points: &[SessionPoint]) -> TrendModel {
    ProgressionForecaster::default().fit_trend(points)
}

pub fn project_future(points: &[SessionPoint], sessions_ahead: usize) -> Vec<SessionPoint> {
    ProgressionForecaster::default().project_future(points, sessions_ahead)
}

pub fn predict_target_attainment(points: &[SessionPoint], target: f64) -> Option<Prediction> {
    ProgressionForecaster::default().predict_target_attainment(points, target)
}

pub fn recommend_load(smoothed: &[SessionPoint], raw: &[SessionPoint]) -> Option<Recommendation> {
    ProgressionForecaster::default().recommend_load(smoothed, raw)
}

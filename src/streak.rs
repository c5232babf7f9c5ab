//! Streak Engine
//!
//! One streak walk, instantiated three ways:
//! - gym: "has a workout that day", tolerant of a few rest days
//! - nutrition: "daily calories >= goal", strict, today still accumulating
//! - combined: both of the above on the same day, strict
//!
//! Everything here is pure: callers fetch the qualifying days first and
//! hand them in as a set or predicate. Nothing is cached between calls.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days walked backward before giving up (matches the history fetch window)
pub const DEFAULT_HORIZON_DAYS: u32 = 730;

/// Rest days a gym streak survives before breaking
pub const DEFAULT_GYM_REST_DAYS: u32 = 2;

// ---------------------------------------------------------------------------
/// Daily Metric: accumulated value per calendar day
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric(BTreeMap<NaiveDate, f64>);

impl DailyMetric {
    /// Sum every entry onto its calendar day
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut totals = BTreeMap::new();
        for (date, value) in entries {
            *totals.entry(date).or_insert(0.0) += value;
        }
        Self(totals)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.0.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Days whose total reached the goal
    pub fn days_meeting(&self, goal: f64) -> BTreeSet<NaiveDate> {
        self.0
            .iter()
            .filter(|(_, total)| **total >= goal)
            .map(|(date, _)| *date)
            .collect()
    }
}

// ---------------------------------------------------------------------------
/// Streak Policy: how a streak variant is evaluated
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Gym,
    Nutrition,
    Combined,
}

impl std::fmt::Display for StreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gym => write!(f, "gym"),
            Self::Nutrition => write!(f, "nutrition"),
            Self::Combined => write!(f, "combined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    pub kind: StreakKind,
    /// Consecutive misses allowed before the streak breaks (0 = strict)
    pub rest_day_tolerance: u32,
    /// Today's value may still be accumulating: walk from yesterday and
    /// only add today once it already qualifies
    pub today_incomplete: bool,
    /// Whether qualifying days advance the calendar-day length. Always
    /// true for the gym, nutrition and combined policies, and the walks
    /// assume it: length is the span from the earliest to the latest
    /// qualifying day, tolerated rest days included.
    pub counts_toward_length: bool,
}

impl StreakPolicy {
    pub fn gym(rest_day_tolerance: u32) -> Self {
        Self {
            kind: StreakKind::Gym,
            rest_day_tolerance,
            today_incomplete: false,
            counts_toward_length: true,
        }
    }

    pub fn nutrition() -> Self {
        Self {
            kind: StreakKind::Nutrition,
            rest_day_tolerance: 0,
            today_incomplete: true,
            counts_toward_length: true,
        }
    }

    pub fn combined() -> Self {
        Self {
            kind: StreakKind::Combined,
            ..Self::nutrition()
        }
    }
}

// ---------------------------------------------------------------------------
/// Streak Result: derived view, recomputed on every query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    pub current: u32,
    pub best: u32,
    pub at_risk: bool,
}

/// All three streak variants for one user on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub as_of: NaiveDate,
    pub gym: StreakResult,
    pub nutrition: StreakResult,
    pub combined: StreakResult,
}

// ---------------------------------------------------------------------------
/// Core walks
// ---------------------------------------------------------------------------

fn span_days(latest: NaiveDate, earliest: NaiveDate) -> u32 {
    ((latest - earliest).num_days() + 1).max(0) as u32
}

/// Walk backward from `as_of` and measure the streak ending there.
///
/// Misses inside the tolerance neither reset nor extend the count: the
/// length is the inclusive span between the earliest and the most recent
/// qualifying day reached before the tolerance ran out.
pub fn current_streak_with<F>(qualifies: F, as_of: NaiveDate, rest_day_tolerance: u32, horizon_days: u32) -> u32
where
    F: Fn(NaiveDate) -> bool,
{
    let mut consecutive_misses = 0u32;
    let mut latest: Option<NaiveDate> = None;
    let mut earliest: Option<NaiveDate> = None;

    for offset in 0..i64::from(horizon_days) {
        let day = as_of - Duration::days(offset);
        if qualifies(day) {
            consecutive_misses = 0;
            latest.get_or_insert(day);
            earliest = Some(day);
        } else {
            consecutive_misses += 1;
            if consecutive_misses > rest_day_tolerance {
                break;
            }
        }
    }

    match (latest, earliest) {
        (Some(l), Some(e)) => span_days(l, e),
        _ => 0,
    }
}

/// Set form of [`current_streak_with`]
pub fn current_streak(
    qualifying_dates: &BTreeSet<NaiveDate>,
    as_of: NaiveDate,
    rest_day_tolerance: u32,
    horizon_days: u32,
) -> u32 {
    current_streak_with(|d| qualifying_dates.contains(&d), as_of, rest_day_tolerance, horizon_days)
}

/// Longest streak anywhere in the history, walking forward in time
pub fn best_streak(qualifying_dates: &BTreeSet<NaiveDate>, rest_day_tolerance: u32) -> u32 {
    let (Some(&first), Some(&last)) = (qualifying_dates.first(), qualifying_dates.last()) else {
        return 0;
    };

    let mut best = 0u32;
    let mut streak_start: Option<NaiveDate> = None;
    let mut consecutive_misses = 0u32;

    for day in first.iter_days().take_while(|d| *d <= last) {
        if qualifying_dates.contains(&day) {
            consecutive_misses = 0;
            let start = *streak_start.get_or_insert(day);
            best = best.max(span_days(day, start));
        } else {
            consecutive_misses += 1;
            if consecutive_misses > rest_day_tolerance {
                streak_start = None;
            }
        }
    }

    best
}

/// Whether the streak breaks unless the user acts soon.
///
/// Rest-tolerant streaks are at risk once both today and yesterday are
/// empty; strict streaks as soon as today has not qualified yet.
pub fn at_risk(current: u32, qualified_today: bool, qualified_yesterday: bool, rest_day_tolerance: u32) -> bool {
    if current == 0 {
        return false;
    }
    if rest_day_tolerance > 0 {
        !qualified_today && !qualified_yesterday
    } else {
        !qualified_today
    }
}

/// Days that qualify for both gym and nutrition
pub fn combined_days(gym: &BTreeSet<NaiveDate>, nutrition: &BTreeSet<NaiveDate>) -> BTreeSet<NaiveDate> {
    gym.intersection(nutrition).copied().collect()
}

// ---------------------------------------------------------------------------
/// Streak Engine: a policy bound to a horizon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakEngine {
    pub policy: StreakPolicy,
    pub horizon_days: u32,
}

impl StreakEngine {
    pub fn new(policy: StreakPolicy, horizon_days: u32) -> Self {
        Self { policy, horizon_days }
    }

    /// Current streak as of `today`, honoring the today-incomplete rule
    pub fn current(&self, qualifying: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
        let tolerance = self.policy.rest_day_tolerance;
        if !self.policy.today_incomplete {
            return current_streak(qualifying, today, tolerance, self.horizon_days);
        }

        let Some(yesterday) = today.pred_opt() else {
            return u32::from(qualifying.contains(&today));
        };
        let before_today = current_streak(qualifying, yesterday, tolerance, self.horizon_days.saturating_sub(1));
        before_today + u32::from(qualifying.contains(&today))
    }

    pub fn evaluate(&self, qualifying: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakResult {
        if qualifying.is_empty() {
            return StreakResult::default();
        }

        let current = self.current(qualifying, today);
        let best = best_streak(qualifying, self.policy.rest_day_tolerance);
        let qualified_today = qualifying.contains(&today);
        let qualified_yesterday = today.pred_opt().is_some_and(|d| qualifying.contains(&d));

        StreakResult {
            current,
            best,
            at_risk: at_risk(current, qualified_today, qualified_yesterday, self.policy.rest_day_tolerance),
        }
    }
}

/// Evaluate gym, nutrition and combined streaks from raw inputs.
///
/// Without a calorie goal nothing can meet it, so the nutrition and
/// combined streaks stay zeroed.
pub fn summarize(
    workout_dates: &BTreeSet<NaiveDate>,
    daily_calories: &DailyMetric,
    calorie_goal: Option<f64>,
    gym_rest_days: u32,
    horizon_days: u32,
    today: NaiveDate,
) -> StreakSummary {
    let gym = StreakEngine::new(StreakPolicy::gym(gym_rest_days), horizon_days).evaluate(workout_dates, today);

    let nutrition_days = calorie_goal
        .filter(|goal| *goal > 0.0)
        .map(|goal| daily_calories.days_meeting(goal))
        .unwrap_or_default();
    let nutrition = StreakEngine::new(StreakPolicy::nutrition(), horizon_days).evaluate(&nutrition_days, today);

    let both = combined_days(workout_dates, &nutrition_days);
    let combined = StreakEngine::new(StreakPolicy::combined(), horizon_days).evaluate(&both, today);

    StreakSummary {
        as_of: today,
        gym,
        nutrition,
        combined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // 2024-01-01 is a Monday
    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
    }

    fn dates(offsets: &[i64]) -> BTreeSet<NaiveDate> {
        offsets.iter().map(|n| day(*n)).collect()
    }

    #[test]
    fn test_gym_streak_within_tolerance() {
        // Mon, Tue, Thu, Fri with Wednesday rested
        let qualifying = dates(&[0, 1, 3, 4]);
        assert_eq!(current_streak(&qualifying, day(4), 2, DEFAULT_HORIZON_DAYS), 5);
    }

    #[test]
    fn test_gym_streak_tolerance_breached() {
        // Only Monday, Tue-Fri missed
        let qualifying = dates(&[0]);
        assert_eq!(current_streak(&qualifying, day(4), 2, DEFAULT_HORIZON_DAYS), 0);
    }

    #[test]
    fn test_trailing_rest_days_do_not_count() {
        // Trained Mon-Wed, rested Thu and Fri
        let qualifying = dates(&[0, 1, 2]);
        assert_eq!(current_streak(&qualifying, day(4), 2, DEFAULT_HORIZON_DAYS), 3);
    }

    #[test]
    fn test_strict_streak_counts_consecutive_days() {
        let qualifying = dates(&[0, 1, 2, 4, 5]);
        assert_eq!(current_streak(&qualifying, day(5), 0, DEFAULT_HORIZON_DAYS), 2);
        assert_eq!(current_streak(&qualifying, day(3), 0, DEFAULT_HORIZON_DAYS), 0);
    }

    #[test]
    fn test_horizon_limits_walk() {
        let qualifying: BTreeSet<_> = (0..30).map(day).collect();
        assert_eq!(current_streak(&qualifying, day(29), 0, 10), 10);
        assert_eq!(current_streak(&qualifying, day(29), 0, 0), 0);
    }

    #[test]
    fn test_predicate_form_matches_set_form() {
        let qualifying = dates(&[0, 2, 3, 6]);
        let by_predicate = current_streak_with(|d| qualifying.contains(&d), day(6), 2, 30);
        assert_eq!(by_predicate, current_streak(&qualifying, day(6), 2, 30));
        assert_eq!(by_predicate, 7);
    }

    #[test]
    fn test_nutrition_streak_today_incomplete() {
        // Goal 2000: Mon 2100, Tue 1900, Wed 2200
        let metric = DailyMetric::from_entries([(day(0), 2100.0), (day(1), 1900.0), (day(2), 2200.0)]);
        let qualifying = metric.days_meeting(2000.0);
        let engine = StreakEngine::new(StreakPolicy::nutrition(), DEFAULT_HORIZON_DAYS);

        // Tuesday missed, so only Wednesday counts
        assert_eq!(engine.current(&qualifying, day(2)), 1);

        // All three days met
        let metric = DailyMetric::from_entries([(day(0), 2100.0), (day(1), 2050.0), (day(2), 2200.0)]);
        let qualifying = metric.days_meeting(2000.0);
        assert_eq!(engine.current(&qualifying, day(2)), 3);
    }

    #[test]
    fn test_nutrition_streak_survives_unfinished_today() {
        let qualifying = dates(&[0, 1]);
        let engine = StreakEngine::new(StreakPolicy::nutrition(), DEFAULT_HORIZON_DAYS);

        let result = engine.evaluate(&qualifying, day(2));
        assert_eq!(result.current, 2);
        assert!(result.at_risk, "today has not qualified yet");
    }

    #[test]
    fn test_daily_metric_sums_same_day() {
        let metric = DailyMetric::from_entries([(day(0), 800.0), (day(0), 700.0), (day(1), 300.0)]);
        assert_eq!(metric.len(), 2);
        assert_eq!(metric.get(day(0)), Some(1500.0));
        assert_eq!(metric.get(day(2)), None);
        assert_eq!(metric.days_meeting(1000.0), dates(&[0]));
    }

    #[test]
    fn test_best_streak_forward_walk() {
        let qualifying = dates(&[0, 1, 2, 10, 12, 14, 15]);
        assert_eq!(best_streak(&qualifying, 0), 3);
        assert_eq!(best_streak(&qualifying, 2), 6);
        assert_eq!(best_streak(&BTreeSet::new(), 2), 0);
    }

    #[test]
    fn test_at_risk_rules() {
        // Rest-tolerant: both days empty
        assert!(at_risk(4, false, false, 2));
        assert!(!at_risk(4, false, true, 2));
        assert!(!at_risk(0, false, false, 2));

        // Strict: today empty
        assert!(at_risk(4, false, true, 0));
        assert!(!at_risk(4, true, false, 0));
    }

    #[test]
    fn test_empty_history_is_zeroed() {
        let engine = StreakEngine::new(StreakPolicy::gym(2), DEFAULT_HORIZON_DAYS);
        assert_eq!(engine.evaluate(&BTreeSet::new(), day(0)), StreakResult::default());
    }

    #[test]
    fn test_summarize_all_variants() {
        let workouts = dates(&[0, 1, 3, 4]);
        let calories = DailyMetric::from_entries([
            (day(2), 2100.0),
            (day(3), 2300.0),
            (day(4), 2500.0),
        ]);

        let summary = summarize(&workouts, &calories, Some(2000.0), 2, DEFAULT_HORIZON_DAYS, day(4));
        assert_eq!(summary.gym.current, 5);
        assert_eq!(summary.nutrition.current, 3);
        assert_eq!(summary.combined.current, 2);
        assert!(!summary.gym.at_risk);

        let no_goal = summarize(&workouts, &calories, None, 2, DEFAULT_HORIZON_DAYS, day(4));
        assert_eq!(no_goal.nutrition, StreakResult::default());
        assert_eq!(no_goal.combined, StreakResult::default());
    }

    #[test]
    fn test_policy_constructors() {
        assert_eq!(StreakPolicy::gym(2).rest_day_tolerance, 2);
        assert!(!StreakPolicy::gym(2).today_incomplete);
        assert_eq!(StreakPolicy::combined().kind, StreakKind::Combined);
        assert!(StreakPolicy::combined().today_incomplete);
        assert_eq!(StreakKind::Nutrition.to_string(), "nutrition");
        for policy in [StreakPolicy::gym(0), StreakPolicy::gym(3), StreakPolicy::nutrition(), StreakPolicy::combined()] {
            assert!(policy.counts_toward_length, "{} policy", policy.kind);
        }
    }

    proptest! {
        #[test]
        fn prop_best_never_below_current(
            offsets in prop::collection::btree_set(0i64..60, 0..40),
            as_of in 0i64..70,
            tolerance in 0u32..4,
        ) {
            let qualifying: BTreeSet<_> = offsets.iter().map(|n| day(*n)).collect();
            let current = current_streak(&qualifying, day(as_of), tolerance, DEFAULT_HORIZON_DAYS);
            prop_assert!(best_streak(&qualifying, tolerance) >= current);
        }

        #[test]
        fn prop_adding_a_day_never_lowers_best(
            offsets in prop::collection::btree_set(0i64..60, 0..40),
            extra in 0i64..60,
            tolerance in 0u32..4,
        ) {
            let mut qualifying: BTreeSet<_> = offsets.iter().map(|n| day(*n)).collect();
            let before = best_streak(&qualifying, tolerance);
            qualifying.insert(day(extra));
            prop_assert!(best_streak(&qualifying, tolerance) >= before);
        }

        #[test]
        fn prop_engine_best_covers_current(
            offsets in prop::collection::btree_set(0i64..40, 1..30),
            today in 0i64..45,
        ) {
            let qualifying: BTreeSet<_> = offsets.iter().map(|n| day(*n)).collect();
            for policy in [StreakPolicy::gym(2), StreakPolicy::nutrition()] {
                let result = StreakEngine::new(policy, DEFAULT_HORIZON_DAYS).evaluate(&qualifying, day(today));
                prop_assert!(result.best >= result.current);
            }
        }
    }
}

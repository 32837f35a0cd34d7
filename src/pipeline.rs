//! Pipeline orchestration
//!
//! This module provides the public API for the Plate engine. It runs the trend,
//! habit and insight stages over a snapshot and bundles the results for the
//! dashboard, and runs the metabolic planner for onboarding.

use crate::behavior::BehaviorAggregator;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::insight::InsightClassifier;
use crate::metabolic::MetabolicPlanner;
use crate::schema::RecordAdapter;
use crate::trend::{summarize_with, TrendCalculator};
use crate::types::{Dashboard, OnboardingPlan, OnboardingProfile, Snapshot, WeightReading};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Convert plate.record.v1 input (JSON array or NDJSON) to dashboard JSON.
///
/// # Arguments
/// * `records` - Weight and plate-check records
/// * `today` - Last day of the habit window
///
/// # Example
/// ```ignore
/// let dashboard_json = dashboard_from_records(records_json, today)?;
/// ```
pub fn dashboard_from_records(records: String, today: NaiveDate) -> Result<String, EngineError> {
    let parsed = RecordAdapter::parse(&records)?;
    let snapshot = RecordAdapter::to_snapshot(&parsed, 0);
    let dashboard = compute_dashboard(&snapshot, today, &EngineConfig::default());
    serde_json::to_string(&dashboard).map_err(|e| EngineError::EncodingError(e.to_string()))
}

/// Convert an onboarding profile JSON document to onboarding plan JSON.
pub fn onboarding_from_json(profile: String, today: NaiveDate) -> Result<String, EngineError> {
    let profile: OnboardingProfile = serde_json::from_str(&profile)?;
    let plan = plan_onboarding(&profile, today)?;
    serde_json::to_string(&plan).map_err(|e| EngineError::EncodingError(e.to_string()))
}

/// Run the dashboard stages over a snapshot.
///
/// Pipeline stages:
/// 1. Drop readings the trend calculator cannot take (non-positive, NaN) and
///    keep one reading per date
/// 2. TrendCalculator - EMA series over the full reading history
/// 3. Trend summary - week-over-week delta and direction
/// 4. BehaviorAggregator - adherence over the trailing window
/// 5. InsightClassifier - one fixed message
pub fn compute_dashboard(snapshot: &Snapshot, today: NaiveDate, config: &EngineConfig) -> Dashboard {
    let readings = one_reading_per_day(&snapshot.readings);

    let series = TrendCalculator::new(config.ema_alpha).compute(&readings);
    let summary = summarize_with(&series, config.flat_deadband_kg, config.week_lookback_days);

    let weekly = BehaviorAggregator::new(config.window_days).aggregate(&snapshot.logs, today);

    let has_enough_data = weekly.total_logged_days >= config.min_logged_days
        || series.len() >= config.min_trend_points;

    let insight = InsightClassifier::new(config.high_adherence_pct)
        .classify(weekly.adherence_pct, summary.direction, has_enough_data)
        .to_string();

    debug!(
        generation = snapshot.generation,
        trend_points = series.len(),
        logged_days = weekly.total_logged_days,
        adherence_pct = weekly.adherence_pct,
        direction = summary.direction.as_str(),
        has_enough_data,
        "dashboard computed"
    );

    Dashboard {
        generation: snapshot.generation,
        sparkline: series.latest(config.sparkline_points).to_vec(),
        summary,
        weekly,
        insight,
        has_enough_data,
    }
}

/// Valid readings folded to one per date. The later capture wins; equal captures
/// keep the reading listed later.
fn one_reading_per_day(readings: &[WeightReading]) -> Vec<WeightReading> {
    let mut by_date: BTreeMap<NaiveDate, &WeightReading> = BTreeMap::new();

    for reading in readings {
        if !reading.is_valid() {
            debug!(date = %reading.date, weight_kg = reading.weight_kg, "dropping invalid weight reading");
            continue;
        }
        match by_date.get(&reading.date) {
            Some(existing) if existing.captured_at_millis > reading.captured_at_millis => {
                debug!(date = %reading.date, "dropping superseded weight reading");
            }
            _ => {
                by_date.insert(reading.date, reading);
            }
        }
    }

    by_date.into_values().cloned().collect()
}

/// Compute onboarding targets and, when a target weight is given, the arrival estimate
pub fn plan_onboarding(
    profile: &OnboardingProfile,
    today: NaiveDate,
) -> Result<OnboardingPlan, EngineError> {
    let macro_plan = MetabolicPlanner::plan(
        profile.sex,
        profile.age,
        profile.height_cm,
        profile.weight_kg,
        profile.activity,
        profile.goal,
    );

    let arrival = profile
        .target_weight_kg
        .map(|target| MetabolicPlanner::estimate_arrival(profile.weight_kg, target, today))
        .transpose()?;

    Ok(OnboardingPlan {
        macro_plan,
        arrival,
    })
}

/// Stateful processor that recomputes on every snapshot and drops stale ones.
///
/// Snapshots are full replacements, so no engine state carries over between
/// them; the processor only remembers the newest generation it has accepted.
#[derive(Debug, Clone, Default)]
pub struct DashboardProcessor {
    config: EngineConfig,
    latest_generation: Option<u64>,
}

impl DashboardProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with a validated config
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            latest_generation: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Newest generation accepted so far
    pub fn latest_generation(&self) -> Option<u64> {
        self.latest_generation
    }

    /// Compute a dashboard without touching generation tracking
    pub fn compute(&self, snapshot: &Snapshot, today: NaiveDate) -> Dashboard {
        compute_dashboard(snapshot, today, &self.config)
    }

    /// Accept a snapshot and recompute. Returns `None` if a newer snapshot was
    /// already accepted.
    pub fn accept(&mut self, snapshot: &Snapshot, today: NaiveDate) -> Option<Dashboard> {
        match self.latest_generation {
            Some(latest) if snapshot.generation < latest => {
                debug!(
                    generation = snapshot.generation,
                    latest, "discarding stale snapshot"
                );
                None
            }
            _ => {
                self.latest_generation = Some(snapshot.generation);
                Some(self.compute(snapshot, today))
            }
        }
    }

    /// Whether a dashboard was computed from the newest accepted snapshot
    pub fn is_current(&self, dashboard: &Dashboard) -> bool {
        self.latest_generation == Some(dashboard.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::{message_for, NOT_ENOUGH_DATA_MESSAGE};
    use crate::logbook::LogBook;
    use crate::types::{
        ActivityLevel, AdherenceTier, DayBehaviorLog, Goal, MealCheck, MealSlot, Sex,
        TrendDirection,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    fn protein_log(date: NaiveDate) -> DayBehaviorLog {
        DayBehaviorLog::new(date).with_meal(
            MealSlot::Dinner,
            MealCheck {
                protein_present: true,
                plants_present: true,
                satiety: 4,
                captured_at_millis: 0,
            },
        )
    }

    fn falling_snapshot(days: i64) -> Snapshot {
        Snapshot {
            generation: 1,
            readings: (0..days)
                .map(|n| WeightReading::new(days_ago(days - 1 - n), 85.0 - 0.2 * n as f64))
                .collect(),
            logs: (0..7).map(|n| protein_log(days_ago(n))).collect(),
        }
    }

    fn sample_records() -> &'static str {
        r#"
{"kind": "weight", "date": "2026-10-14", "weight_kg": 70.0}
{"kind": "weight", "date": "2026-10-15", "weight_kg": 70.5}
{"kind": "weight", "date": "2026-10-16", "weight_kg": 69.8}
{"kind": "meal", "date": "2026-10-16", "slot": "lunch", "protein_present": true, "plants_present": false, "satiety": 3}
"#
    }

    #[test]
    fn test_empty_snapshot_fails_closed() {
        let dashboard = compute_dashboard(&Snapshot::default(), today(), &EngineConfig::default());

        assert!(!dashboard.has_enough_data);
        assert_eq!(dashboard.insight, NOT_ENOUGH_DATA_MESSAGE);
        assert_eq!(dashboard.summary.current_trend_kg, None);
        assert_eq!(dashboard.current_trend_label(), "--");
        assert!(dashboard.sparkline.is_empty());
        assert_eq!(dashboard.weekly.adherence_pct, 0);
    }

    #[test]
    fn test_high_adherence_falling_trend() {
        let dashboard = compute_dashboard(&falling_snapshot(20), today(), &EngineConfig::default());

        assert!(dashboard.has_enough_data);
        assert_eq!(dashboard.weekly.adherence_pct, 100);
        assert_eq!(dashboard.summary.direction, TrendDirection::Down);
        assert_eq!(
            dashboard.insight,
            message_for(AdherenceTier::High, TrendDirection::Down)
        );
        assert_eq!(dashboard.sparkline.len(), 7);
        assert_eq!(dashboard.sparkline.last().unwrap().date, today());
    }

    #[test]
    fn test_three_readings_are_enough_data() {
        let snapshot = Snapshot {
            generation: 0,
            readings: (0..3).map(|n| WeightReading::new(days_ago(n), 70.0)).collect(),
            logs: vec![],
        };
        let dashboard = compute_dashboard(&snapshot, today(), &EngineConfig::default());

        assert!(dashboard.has_enough_data);
        assert_eq!(
            dashboard.insight,
            message_for(AdherenceTier::Low, TrendDirection::Flat)
        );
    }

    #[test]
    fn test_three_logged_days_are_enough_data() {
        let snapshot = Snapshot {
            generation: 0,
            readings: vec![],
            logs: (0..3).map(|n| protein_log(days_ago(n))).collect(),
        };
        let dashboard = compute_dashboard(&snapshot, today(), &EngineConfig::default());

        assert!(dashboard.has_enough_data);
        assert_eq!(dashboard.weekly.adherence_pct, 43);
    }

    #[test]
    fn test_two_of_each_is_not_enough() {
        let snapshot = Snapshot {
            generation: 0,
            readings: (0..2).map(|n| WeightReading::new(days_ago(n), 70.0)).collect(),
            logs: (0..2).map(|n| protein_log(days_ago(n))).collect(),
        };
        let dashboard = compute_dashboard(&snapshot, today(), &EngineConfig::default());

        assert!(!dashboard.has_enough_data);
        assert_eq!(dashboard.insight, NOT_ENOUGH_DATA_MESSAGE);
    }

    #[test]
    fn test_invalid_readings_are_dropped() {
        let snapshot = Snapshot {
            generation: 0,
            readings: vec![
                WeightReading::new(days_ago(2), 70.0),
                WeightReading::new(days_ago(1), f64::NAN),
                WeightReading::new(today(), -3.0),
            ],
            logs: vec![],
        };
        let dashboard = compute_dashboard(&snapshot, today(), &EngineConfig::default());

        assert_eq!(dashboard.sparkline.len(), 1);
        assert_eq!(dashboard.summary.current_trend_kg, Some(70.0));
    }

    #[test]
    fn test_duplicate_dates_keep_one_reading() {
        let mut early = WeightReading::new(today(), 90.0);
        early.captured_at_millis = 100;
        let mut late = WeightReading::new(today(), 70.0);
        late.captured_at_millis = 200;
        let mut tie = WeightReading::new(days_ago(1), 71.0);
        tie.captured_at_millis = 50;
        let mut tie_later = WeightReading::new(days_ago(1), 71.4);
        tie_later.captured_at_millis = 50;

        let snapshot = Snapshot {
            generation: 0,
            readings: vec![late, early, tie, tie_later],
            logs: vec![],
        };
        let dashboard = compute_dashboard(&snapshot, today(), &EngineConfig::default());

        let raw: Vec<Option<f64>> = dashboard.sparkline.iter().map(|p| p.raw_weight_kg).collect();
        assert_eq!(raw, vec![Some(71.4), Some(70.0)]);
        assert_eq!(dashboard.sparkline[1].date, today());
        // 71.4 * 0.9 + 70.0 * 0.1
        assert_eq!(dashboard.summary.current_trend_kg, Some(71.3));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let snapshot = falling_snapshot(30);
        let config = EngineConfig::default();

        assert_eq!(
            compute_dashboard(&snapshot, today(), &config),
            compute_dashboard(&snapshot, today(), &config)
        );
    }

    #[test]
    fn test_dashboard_from_records() {
        let json = dashboard_from_records(sample_records().to_string(), today()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["summary"]["current_trend_kg"], 70.0);
        assert_eq!(payload["sparkline"].as_array().unwrap().len(), 3);
        assert_eq!(payload["sparkline"][1]["trend_kg"], 70.1);
        assert_eq!(payload["weekly"]["protein_days"], 1);
        assert_eq!(payload["weekly"]["adherence_pct"], 14);
        assert_eq!(payload["has_enough_data"], true);
    }

    #[test]
    fn test_dashboard_from_records_at_min_date() {
        let reading = crate::schema::Record::Weight(WeightReading::new(NaiveDate::MIN, 70.0));
        let records = serde_json::to_string(&vec![reading]).unwrap();

        let json = dashboard_from_records(records, today()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["summary"]["current_trend_kg"], 70.0);
        assert_eq!(payload["summary"]["direction"], "flat");
        assert_eq!(payload["weekly"]["total_logged_days"], 0);
    }

    #[test]
    fn test_dashboard_from_empty_input() {
        let json = dashboard_from_records(String::new(), today()).unwrap();
        let dashboard: Dashboard = serde_json::from_str(&json).unwrap();

        assert!(!dashboard.has_enough_data);
        assert_eq!(dashboard.insight, NOT_ENOUGH_DATA_MESSAGE);
        assert_eq!(dashboard.current_trend_label(), "--");
    }

    #[test]
    fn test_dashboard_from_invalid_input() {
        assert!(dashboard_from_records("not valid json".to_string(), today()).is_err());
    }

    #[test]
    fn test_plan_onboarding_with_target() {
        let profile = OnboardingProfile {
            sex: Sex::Female,
            age: 30,
            height_cm: 170.0,
            weight_kg: 70.0,
            activity: ActivityLevel::Sedentary,
            goal: Goal::WeightLoss,
            target_weight_kg: Some(65.0),
        };
        let plan = plan_onboarding(&profile, today()).unwrap();

        assert_eq!(plan.macro_plan.target_calories, 1242);
        // 70 * 0.0075 = 0.525 kg/week, 5 / 0.525 = 9.52
        assert_eq!(plan.arrival.unwrap().weeks, 10);
    }

    #[test]
    fn test_onboarding_from_json() {
        let json = r#"{
            "sex": "male",
            "age": 25,
            "height_cm": 180.0,
            "weight_kg": 80.0,
            "activity": "moderately_active",
            "goal": "muscle_gain"
        }"#;
        let out = onboarding_from_json(json.to_string(), today()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(payload["macro_plan"]["target_calories"], 3048);
        assert_eq!(payload["macro_plan"]["focus_label"], "Muscle Gain");
        assert!(payload.get("arrival").is_none());
    }

    #[test]
    fn test_processor_discards_stale_snapshot() {
        let mut processor = DashboardProcessor::new();
        let mut newer = falling_snapshot(10);
        newer.generation = 5;
        let mut older = falling_snapshot(4);
        older.generation = 3;

        let current = processor.accept(&newer, today()).unwrap();
        assert!(processor.accept(&older, today()).is_none());
        assert!(processor.is_current(&current));
        assert_eq!(processor.latest_generation(), Some(5));
    }

    #[test]
    fn test_processor_marks_superseded_dashboard() {
        let mut processor = DashboardProcessor::new();
        let mut first = falling_snapshot(10);
        first.generation = 1;
        let mut second = first.clone();
        second.generation = 2;

        let old = processor.accept(&first, today()).unwrap();
        let new = processor.accept(&second, today()).unwrap();

        assert!(!processor.is_current(&old));
        assert!(processor.is_current(&new));
    }

    #[test]
    fn test_processor_with_logbook_subscription() {
        use std::sync::{Arc, Mutex};

        let processor = Arc::new(Mutex::new(DashboardProcessor::new()));
        let latest: Arc<Mutex<Option<Dashboard>>> = Arc::new(Mutex::new(None));

        let mut book = LogBook::new();
        let (proc_ref, sink) = (Arc::clone(&processor), Arc::clone(&latest));
        book.subscribe(Box::new(move |snapshot: &Snapshot| {
            if let Some(dashboard) = proc_ref.lock().unwrap().accept(snapshot, today()) {
                *sink.lock().unwrap() = Some(dashboard);
            }
        }));

        for n in 0..3 {
            book.log_weight(days_ago(2 - n), 70.0 + n as f64 * 0.1, 0).unwrap();
        }

        let dashboard = latest.lock().unwrap().clone().unwrap();
        assert_eq!(dashboard.generation, 3);
        assert!(dashboard.has_enough_data);
        assert_eq!(dashboard.sparkline.len(), 3);
    }

    #[test]
    fn test_processor_rejects_invalid_config() {
        let config = EngineConfig {
            window_days: 0,
            ..EngineConfig::default()
        };
        assert!(DashboardProcessor::with_config(config).is_err());
    }
}

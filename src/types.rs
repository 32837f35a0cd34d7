//! Core types for the Plate engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: durable records (weight readings, meal checks), derived trend and
//! adherence values, onboarding plans, and the view-ready dashboard bundle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single daily weight reading. One per user per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    /// Calendar day this reading belongs to
    pub date: NaiveDate,
    /// Body weight (kg)
    pub weight_kg: f64,
    /// When the reading was captured (unix millis)
    #[serde(default)]
    pub captured_at_millis: i64,
}

impl WeightReading {
    pub fn new(date: NaiveDate, weight_kg: f64) -> Self {
        Self {
            date,
            weight_kg,
            captured_at_millis: 0,
        }
    }

    /// Whether the reading can be fed to the trend calculator
    pub fn is_valid(&self) -> bool {
        self.weight_kg.is_finite() && self.weight_kg > 0.0
    }
}

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }
}

/// Lowest satiety score a plate check accepts
pub const MIN_SATIETY: u8 = 1;
/// Highest satiety score a plate check accepts
pub const MAX_SATIETY: u8 = 5;

/// Plate check for a single meal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCheck {
    /// A protein source was on the plate
    pub protein_present: bool,
    /// Plants (vegetables, fruit, legumes) were on the plate
    pub plants_present: bool,
    /// Satiety score (1-5)
    pub satiety: u8,
    /// When the check was captured (unix millis)
    #[serde(default)]
    pub captured_at_millis: i64,
}

impl MealCheck {
    pub fn is_valid(&self) -> bool {
        (MIN_SATIETY..=MAX_SATIETY).contains(&self.satiety)
    }
}

/// All plate checks logged for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBehaviorLog {
    pub date: NaiveDate,
    /// At most one check per slot
    #[serde(default)]
    pub meals: BTreeMap<MealSlot, MealCheck>,
}

impl DayBehaviorLog {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            meals: BTreeMap::new(),
        }
    }

    /// Insert or overwrite the check for a slot
    pub fn with_meal(mut self, slot: MealSlot, check: MealCheck) -> Self {
        self.meals.insert(slot, check);
        self
    }

    /// Any slot logged protein that day
    pub fn has_protein(&self) -> bool {
        self.meals.values().any(|m| m.protein_present)
    }

    /// Any slot logged plants that day
    pub fn has_plants(&self) -> bool {
        self.meals.values().any(|m| m.plants_present)
    }

    /// At least one slot was logged
    pub fn is_logged(&self) -> bool {
        !self.meals.is_empty()
    }
}

/// One point of the smoothed weight series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Raw reading for this date, if one was taken
    pub raw_weight_kg: Option<f64>,
    /// Smoothed trend weight (kg, 1 decimal)
    pub trend_kg: f64,
}

/// Output of the trend calculator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    /// One point per input reading, ascending by date
    pub points: Vec<TrendPoint>,
    /// Trend of the last point
    pub current: Option<f64>,
    /// Trend of the second-to-last point (equal to `current` for a single reading)
    pub previous: Option<f64>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Up to `n` most recent points, oldest first
    pub fn latest(&self, n: usize) -> &[TrendPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }
}

/// Week-over-week trend movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub const ALL: [TrendDirection; 3] =
        [TrendDirection::Up, TrendDirection::Down, TrendDirection::Flat];

    /// Classify a delta against a symmetric deadband. `|delta| <= deadband` is flat.
    pub fn from_delta(delta_kg: f64, deadband_kg: f64) -> Self {
        if delta_kg.abs() <= deadband_kg {
            TrendDirection::Flat
        } else if delta_kg > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
        }
    }
}

/// Summary of the trend series for the dashboard card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub current_trend_kg: Option<f64>,
    pub trend_kg_week_ago: Option<f64>,
    pub delta_kg: f64,
    pub direction: TrendDirection,
}

impl Default for TrendSummary {
    fn default() -> Self {
        Self {
            current_trend_kg: None,
            trend_kg_week_ago: None,
            delta_kg: 0.0,
            direction: TrendDirection::Flat,
        }
    }
}

/// Habit statistics over the trailing window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// Days with protein on at least one plate
    pub protein_days: u32,
    /// Days with plants on at least one plate
    pub plants_days: u32,
    /// Days with at least one plate check
    pub total_logged_days: u32,
    /// round(protein_days / window * 100), always 0-100
    pub adherence_pct: u8,
    /// Mean satiety over every check in the window (1 decimal)
    pub average_satiety: Option<f64>,
}

/// Adherence tier used to pick an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceTier {
    High,
    Low,
}

impl AdherenceTier {
    pub const ALL: [AdherenceTier; 2] = [AdherenceTier::High, AdherenceTier::Low];

    pub fn from_pct(adherence_pct: u8, high_threshold_pct: u8) -> Self {
        if adherence_pct >= high_threshold_pct {
            AdherenceTier::High
        } else {
            AdherenceTier::Low
        }
    }
}

/// Biological sex used by Mifflin-St Jeor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// Activity level and its TDEE multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::LightlyActive,
        ActivityLevel::ModeratelyActive,
        ActivityLevel::VeryActive,
        ActivityLevel::ExtraActive,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }

    /// Match a raw multiplier to one of the five supported levels
    pub fn from_multiplier(multiplier: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.multiplier() - multiplier).abs() < 1e-9)
    }
}

/// Onboarding goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    WeightLoss,
    Maintenance,
    MuscleGain,
}

impl Goal {
    pub fn focus_label(&self) -> &'static str {
        match self {
            Goal::WeightLoss => "Fat Loss",
            Goal::Maintenance => "Maintenance",
            Goal::MuscleGain => "Muscle Gain",
        }
    }
}

/// Daily energy and protein targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroPlan {
    pub bmr_kcal: i64,
    pub tdee_kcal: i64,
    pub target_calories: i64,
    pub target_protein_grams: i64,
    pub focus_label: String,
}

/// Projected goal-arrival
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEstimate {
    pub weeks: u32,
    pub arrival_date: NaiveDate,
}

impl ArrivalEstimate {
    /// Current weight already equals the target. Not a zero-week projection.
    pub fn is_at_goal(&self) -> bool {
        self.weeks == 0
    }
}

/// Biometrics collected by the onboarding wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingProfile {
    pub sex: Sex,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity: ActivityLevel,
    pub goal: Goal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight_kg: Option<f64>,
}

/// Onboarding output handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingPlan {
    pub macro_plan: MacroPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<ArrivalEstimate>,
}

/// Full-replacement view of a user's durable records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Increases with every change; newer snapshots supersede older ones
    #[serde(default)]
    pub generation: u64,
    /// One reading per date, ascending
    #[serde(default)]
    pub readings: Vec<WeightReading>,
    /// One log per date, ascending
    #[serde(default)]
    pub logs: Vec<DayBehaviorLog>,
}

/// Placeholder shown when a value is not available yet
pub const PLACEHOLDER: &str = "--";

/// View-ready bundle produced on each recomputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Generation of the snapshot this bundle was computed from
    pub generation: u64,
    pub summary: TrendSummary,
    pub weekly: WeeklyStats,
    /// Most recent trend points for the sparkline, oldest first
    pub sparkline: Vec<TrendPoint>,
    pub insight: String,
    pub has_enough_data: bool,
}

impl Dashboard {
    /// Current trend formatted for display, or the placeholder
    pub fn current_trend_label(&self) -> String {
        match self.summary.current_trend_kg {
            Some(kg) => format!("{kg:.1}"),
            None => PLACEHOLDER.to_string(),
        }
    }
}

/// Round half away from zero to a fixed number of decimals
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

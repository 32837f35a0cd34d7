//! Onboarding metabolic targets
//!
//! Closed-form estimates used once at onboarding:
//! - Basal metabolic rate (Mifflin-St Jeor)
//! - Total daily energy expenditure from an activity multiplier
//! - Goal-adjusted calorie target with a per-sex safety floor
//! - Protein target and goal-arrival projection

use crate::error::EngineError;
use crate::types::{ActivityLevel, ArrivalEstimate, Goal, MacroPlan, Sex};
use chrono::{Duration, NaiveDate};

/// Daily deficit applied for weight loss (kcal)
pub const WEIGHT_LOSS_DEFICIT_KCAL: i64 = 500;

/// Daily surplus applied for muscle gain (kcal)
pub const MUSCLE_GAIN_SURPLUS_KCAL: i64 = 250;

/// Calorie target never goes below this for men (kcal)
pub const MALE_CALORIE_FLOOR_KCAL: i64 = 1500;

/// Calorie target never goes below this for women (kcal)
pub const FEMALE_CALORIE_FLOOR_KCAL: i64 = 1200;

/// Protein target per kg of body weight (g)
pub const PROTEIN_GRAMS_PER_KG: f64 = 2.0;

/// Expected weekly change as a fraction of current body weight
pub const WEEKLY_CHANGE_FRACTION: f64 = 0.0075;

/// Planner for onboarding targets
pub struct MetabolicPlanner;

impl MetabolicPlanner {
    /// Compute calorie and protein targets.
    ///
    /// Each stage works from the rounded value of the previous one, matching the
    /// numbers shown to the user during onboarding.
    pub fn plan(
        sex: Sex,
        age: u32,
        height_cm: f64,
        weight_kg: f64,
        activity: ActivityLevel,
        goal: Goal,
    ) -> MacroPlan {
        let bmr_kcal = bmr(sex, age, height_cm, weight_kg).round() as i64;
        let tdee_kcal = (bmr_kcal as f64 * activity.multiplier()).round() as i64;

        let adjusted = match goal {
            Goal::WeightLoss => tdee_kcal - WEIGHT_LOSS_DEFICIT_KCAL,
            Goal::Maintenance => tdee_kcal,
            Goal::MuscleGain => tdee_kcal + MUSCLE_GAIN_SURPLUS_KCAL,
        };
        let target_calories = adjusted.max(calorie_floor(sex));

        let target_protein_grams = (weight_kg * PROTEIN_GRAMS_PER_KG).round() as i64;

        MacroPlan {
            bmr_kcal,
            tdee_kcal,
            target_calories,
            target_protein_grams,
            focus_label: goal.focus_label().to_string(),
        }
    }

    /// Project when the target weight is reached at 0.75% of body weight per week.
    ///
    /// A zero-week result means the user is already at goal; see
    /// [`ArrivalEstimate::is_at_goal`].
    pub fn estimate_arrival(
        current_weight_kg: f64,
        target_weight_kg: f64,
        today: NaiveDate,
    ) -> Result<ArrivalEstimate, EngineError> {
        if !current_weight_kg.is_finite() || current_weight_kg <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "current weight must be a positive number of kg, got {current_weight_kg}"
            )));
        }
        if !target_weight_kg.is_finite() || target_weight_kg <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "target weight must be a positive number of kg, got {target_weight_kg}"
            )));
        }

        let weeks = if current_weight_kg == target_weight_kg {
            0
        } else {
            let weekly_change_kg = current_weight_kg * WEEKLY_CHANGE_FRACTION;
            let weeks = ((target_weight_kg - current_weight_kg).abs() / weekly_change_kg).ceil();
            // `as u64` saturates, so oversized counts fail the u32 conversion
            u32::try_from(weeks as u64).map_err(|_| {
                EngineError::InvalidParameter(format!(
                    "arrival from {current_weight_kg} kg to {target_weight_kg} kg is too far out to project"
                ))
            })?
        };

        let arrival_date = today
            .checked_add_signed(Duration::weeks(i64::from(weeks)))
            .ok_or_else(|| {
                EngineError::InvalidParameter(format!("arrival {weeks} weeks out is out of range"))
            })?;

        Ok(ArrivalEstimate {
            weeks,
            arrival_date,
        })
    }
}

/// Mifflin-St Jeor basal metabolic rate (kcal/day), unrounded
pub fn bmr(sex: Sex, age: u32, height_cm: f64, weight_kg: f64) -> f64 {
    let sex_offset = match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + sex_offset
}

pub fn calorie_floor(sex: Sex) -> i64 {
    match sex {
        Sex::Male => MALE_CALORIE_FLOOR_KCAL,
        Sex::Female => FEMALE_CALORIE_FLOOR_KCAL,
    }
}

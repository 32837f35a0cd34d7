//! plate.record.v1 schema definition

use crate::types::{MealCheck, MealSlot, WeightReading, MAX_SATIETY, MIN_SATIETY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "plate.record.v1";

/// Plate check for one meal slot on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub protein_present: bool,
    pub plants_present: bool,
    pub satiety: u8,
    #[serde(default)]
    pub captured_at_millis: i64,
}

impl MealRecord {
    pub fn check(&self) -> MealCheck {
        MealCheck {
            protein_present: self.protein_present,
            plants_present: self.plants_present,
            satiety: self.satiety,
            captured_at_millis: self.captured_at_millis,
        }
    }
}

/// A single input record, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Weight(WeightReading),
    Meal(MealRecord),
}

impl Record {
    pub fn date(&self) -> NaiveDate {
        match self {
            Record::Weight(reading) => reading.date,
            Record::Meal(meal) => meal.date,
        }
    }

    pub fn captured_at_millis(&self) -> i64 {
        match self {
            Record::Weight(reading) => reading.captured_at_millis,
            Record::Meal(meal) => meal.captured_at_millis,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::Weight(_) => "weight",
            Record::Meal(_) => "meal",
        }
    }

    /// Validate field values
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Record::Weight(reading) => {
                if !reading.weight_kg.is_finite() {
                    return Err(ValidationError::NonFiniteWeight);
                }
                if reading.weight_kg <= 0.0 {
                    return Err(ValidationError::NonPositiveWeight(reading.weight_kg));
                }
                Ok(())
            }
            Record::Meal(meal) => {
                if !(MIN_SATIETY..=MAX_SATIETY).contains(&meal.satiety) {
                    return Err(ValidationError::SatietyOutOfRange(meal.satiety));
                }
                Ok(())
            }
        }
    }
}

/// Validation errors for input records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Weight must be a finite number")]
    NonFiniteWeight,

    #[error("Weight must be positive, got {0} kg")]
    NonPositiveWeight(f64),

    #[error("Satiety must be between 1 and 5, got {0}")]
    SatietyOutOfRange(u8),
}

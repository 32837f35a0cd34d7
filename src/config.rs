//! Engine configuration
//!
//! Tunables for the trend, adherence and insight stages. Defaults reproduce the
//! production constants; a partial JSON document overrides only the keys it names.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// EMA smoothing factor
pub const DEFAULT_EMA_ALPHA: f64 = 0.1;

/// Week-over-week movement at or below this magnitude is flat (kg)
pub const DEFAULT_FLAT_DEADBAND_KG: f64 = 0.15;

/// Trailing window for habit adherence, and the adherence denominator (days)
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Minimum logged days before insights are shown
pub const DEFAULT_MIN_LOGGED_DAYS: u32 = 3;

/// Minimum trend points before insights are shown
pub const DEFAULT_MIN_TREND_POINTS: usize = 3;

/// Adherence at or above this percentage is the high tier
pub const DEFAULT_HIGH_ADHERENCE_PCT: u8 = 60;

/// Trend points handed to the sparkline
pub const DEFAULT_SPARKLINE_POINTS: usize = 7;

/// Distance between the current trend and the comparison point (days)
pub const DEFAULT_WEEK_LOOKBACK_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ema_alpha: f64,
    pub flat_deadband_kg: f64,
    pub window_days: u32,
    pub min_logged_days: u32,
    pub min_trend_points: usize,
    pub high_adherence_pct: u8,
    pub sparkline_points: usize,
    pub week_lookback_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ema_alpha: DEFAULT_EMA_ALPHA,
            flat_deadband_kg: DEFAULT_FLAT_DEADBAND_KG,
            window_days: DEFAULT_WINDOW_DAYS,
            min_logged_days: DEFAULT_MIN_LOGGED_DAYS,
            min_trend_points: DEFAULT_MIN_TREND_POINTS,
            high_adherence_pct: DEFAULT_HIGH_ADHERENCE_PCT,
            sparkline_points: DEFAULT_SPARKLINE_POINTS,
            week_lookback_days: DEFAULT_WEEK_LOOKBACK_DAYS,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.ema_alpha.is_nan() || self.ema_alpha <= 0.0 || self.ema_alpha > 1.0 {
            return Err(EngineError::InvalidParameter(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if self.flat_deadband_kg.is_nan() || self.flat_deadband_kg < 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "flat_deadband_kg must be non-negative, got {}",
                self.flat_deadband_kg
            )));
        }
        if self.window_days == 0 {
            return Err(EngineError::InvalidParameter(
                "window_days must be at least 1".to_string(),
            ));
        }
        if self.high_adherence_pct > 100 {
            return Err(EngineError::InvalidParameter(format!(
                "high_adherence_pct must be 0-100, got {}",
                self.high_adherence_pct
            )));
        }
        Ok(())
    }
}

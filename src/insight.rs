//! Insight classification
//!
//! Maps adherence tier and trend direction to one of six fixed messages, plus a
//! seventh for users without enough history. Selection is a table lookup over
//! the full `AdherenceTier x TrendDirection` product, so every combination has
//! exactly one message.

use crate::config::DEFAULT_HIGH_ADHERENCE_PCT;
use crate::types::{AdherenceTier, TrendDirection};

/// Shown until enough weight readings or plate checks exist
pub const NOT_ENOUGH_DATA_MESSAGE: &str =
    "Keep logging your weight and plates. Your first insight shows up after a few days of data.";

/// Rows: tier (high, low). Columns: direction (up, down, flat).
const INSIGHT_TABLE: [[&str; 3]; 2] = [
    [
        "Your protein habit is strong. A rising trend can be water or muscle, so give it another week before changing anything.",
        "Protein-forward plates and a falling trend. The habit is working, keep it steady.",
        "Great protein consistency. Your trend is holding steady while your body catches up.",
    ],
    [
        "Your trend is creeping up. Start with one protein-first plate a day to rebuild momentum.",
        "Your trend is moving down. Adding protein to more plates will help protect muscle on the way.",
        "Your trend is steady. Building more meals around protein is the next lever to pull.",
    ],
];

fn tier_index(tier: AdherenceTier) -> usize {
    match tier {
        AdherenceTier::High => 0,
        AdherenceTier::Low => 1,
    }
}

fn direction_index(direction: TrendDirection) -> usize {
    match direction {
        TrendDirection::Up => 0,
        TrendDirection::Down => 1,
        TrendDirection::Flat => 2,
    }
}

/// Message for a tier and direction
pub fn message_for(tier: AdherenceTier, direction: TrendDirection) -> &'static str {
    INSIGHT_TABLE[tier_index(tier)][direction_index(direction)]
}

/// Insight classifier
#[derive(Debug, Clone, Copy)]
pub struct InsightClassifier {
    high_adherence_pct: u8,
}

impl Default for InsightClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_ADHERENCE_PCT)
    }
}

impl InsightClassifier {
    pub fn new(high_adherence_pct: u8) -> Self {
        Self { high_adherence_pct }
    }

    /// Pick the insight message. Without enough data the other inputs are ignored.
    pub fn classify(
        &self,
        adherence_pct: u8,
        direction: TrendDirection,
        has_enough_data: bool,
    ) -> &'static str {
        if !has_enough_data {
            return NOT_ENOUGH_DATA_MESSAGE;
        }
        let tier = AdherenceTier::from_pct(adherence_pct, self.high_adherence_pct);
        message_for(tier, direction)
    }
}

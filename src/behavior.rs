//! Weekly habit aggregation
//!
//! Counts protein and plant days over the trailing window ending today and
//! derives the adherence percentage shown on the habits card.

use crate::config::DEFAULT_WINDOW_DAYS;
use crate::types::{round_to, DayBehaviorLog, MealCheck, MealSlot, WeeklyStats};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Aggregator for plate-check logs
#[derive(Debug, Clone, Copy)]
pub struct BehaviorAggregator {
    window_days: u32,
}

impl Default for BehaviorAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS)
    }
}

impl BehaviorAggregator {
    /// Create an aggregator over a trailing window (days, including today)
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// First day of the inclusive window ending at `today`, clamped to the
    /// earliest representable date
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_signed(Duration::days(i64::from(self.window_days) - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Aggregate logs over `[today - (window - 1), today]`.
    ///
    /// Logs outside the window are ignored. The adherence denominator is the
    /// window length, not the number of logged days: three perfect days out of
    /// seven is 43%, not 100%.
    pub fn aggregate(&self, logs: &[DayBehaviorLog], today: NaiveDate) -> WeeklyStats {
        let start = self.window_start(today);
        let days = merge_by_day(logs.iter().filter(|log| log.date >= start && log.date <= today));

        let mut protein_days = 0u32;
        let mut plants_days = 0u32;
        let mut total_logged_days = 0u32;
        let mut satiety_sum = 0u32;
        let mut satiety_count = 0u32;

        for meals in days.values() {
            if meals.is_empty() {
                continue;
            }
            total_logged_days += 1;
            if meals.values().any(|m| m.protein_present) {
                protein_days += 1;
            }
            if meals.values().any(|m| m.plants_present) {
                plants_days += 1;
            }
            for check in meals.values() {
                satiety_sum += u32::from(check.satiety);
                satiety_count += 1;
            }
        }

        let average_satiety = (satiety_count > 0)
            .then(|| round_to(f64::from(satiety_sum) / f64::from(satiety_count), 1));

        WeeklyStats {
            protein_days,
            plants_days,
            total_logged_days,
            adherence_pct: adherence_pct(protein_days, self.window_days),
            average_satiety,
        }
    }
}

/// round(days / window * 100), clamped to 0-100
pub fn adherence_pct(days: u32, window_days: u32) -> u8 {
    if window_days == 0 {
        return 0;
    }
    let pct = (f64::from(days) / f64::from(window_days) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Fold logs sharing a date into one slot map. A slot logged twice keeps the
/// later capture; equal captures keep the later log.
fn merge_by_day<'a>(
    logs: impl Iterator<Item = &'a DayBehaviorLog>,
) -> BTreeMap<NaiveDate, BTreeMap<MealSlot, &'a MealCheck>> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<MealSlot, &'a MealCheck>> = BTreeMap::new();

    for log in logs {
        let slots = days.entry(log.date).or_default();
        for (slot, check) in &log.meals {
            match slots.get(slot) {
                Some(existing) if existing.captured_at_millis > check.captured_at_millis => {}
                _ => {
                    slots.insert(*slot, check);
                }
            }
        }
    }

    days
}

//! Weight trend smoothing
//!
//! Turns raw daily weight readings into an exponentially smoothed trend series
//! and summarizes week-over-week movement for the dashboard.
//!
//! The series is always replayed in full from the ordered reading history. No
//! running value is kept between calls, so identical input yields identical output.

use crate::config::{DEFAULT_EMA_ALPHA, DEFAULT_FLAT_DEADBAND_KG, DEFAULT_WEEK_LOOKBACK_DAYS};
use crate::types::{round_to, TrendDirection, TrendPoint, TrendSeries, TrendSummary, WeightReading};
use chrono::Duration;

/// Trend weights are reported with one decimal
const TREND_DECIMALS: i32 = 1;

/// Deltas are reported with two decimals
const DELTA_DECIMALS: i32 = 2;

/// EMA trend calculator
#[derive(Debug, Clone, Copy)]
pub struct TrendCalculator {
    alpha: f64,
}

impl Default for TrendCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_EMA_ALPHA)
    }
}

impl TrendCalculator {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compute the trend series.
    ///
    /// The recurrence is seeded with the first reading and steps once per reading,
    /// not once per calendar day: a reading after a gap is the next sample.
    /// Readings are taken in ascending date order. Weights are not validated here;
    /// callers drop non-positive or NaN readings first.
    pub fn compute(&self, readings: &[WeightReading]) -> TrendSeries {
        let mut ordered: Vec<&WeightReading> = readings.iter().collect();
        ordered.sort_by_key(|r| r.date);

        let mut points = Vec::with_capacity(ordered.len());
        let mut trend: Option<f64> = None;

        for reading in ordered {
            let next = match trend {
                None => reading.weight_kg,
                Some(prev) => prev * (1.0 - self.alpha) + reading.weight_kg * self.alpha,
            };
            trend = Some(next);

            points.push(TrendPoint {
                date: reading.date,
                raw_weight_kg: Some(reading.weight_kg),
                trend_kg: round_to(next, TREND_DECIMALS),
            });
        }

        let current = points.last().map(|p| p.trend_kg);
        let previous = if points.len() >= 2 {
            Some(points[points.len() - 2].trend_kg)
        } else {
            current
        };

        TrendSeries {
            points,
            current,
            previous,
        }
    }
}

/// Summarize week-over-week movement with the default deadband and lookback
pub fn summarize(series: &TrendSeries) -> TrendSummary {
    summarize_with(series, DEFAULT_FLAT_DEADBAND_KG, DEFAULT_WEEK_LOOKBACK_DAYS)
}

/// Summarize week-over-week movement.
///
/// The comparison point is the most recent point dated at least `lookback_days`
/// before the last point. With less history than that, or when the lookback
/// runs past the earliest representable date, the earliest point is used.
pub fn summarize_with(series: &TrendSeries, deadband_kg: f64, lookback_days: u32) -> TrendSummary {
    let Some(last) = series.points.last() else {
        return TrendSummary::default();
    };

    let cutoff = last
        .date
        .checked_sub_signed(Duration::days(i64::from(lookback_days)));
    let week_ago = cutoff
        .and_then(|cutoff| series.points.iter().rev().find(|p| p.date <= cutoff))
        .or_else(|| series.points.first())
        .map(|p| p.trend_kg);

    let delta_kg = match (series.current, week_ago) {
        (Some(current), Some(past)) => round_to(current - past, DELTA_DECIMALS),
        _ => 0.0,
    };

    TrendSummary {
        current_trend_kg: series.current,
        trend_kg_week_ago: week_ago,
        delta_kg,
        direction: TrendDirection::from_delta(delta_kg, deadband_kg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap() + Duration::days(offset)
    }

    fn readings(weights: &[f64]) -> Vec<WeightReading> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightReading::new(day(i as i64), *w))
            .collect()
    }

    fn trends(series: &TrendSeries) -> Vec<f64> {
        series.points.iter().map(|p| p.trend_kg).collect()
    }

    #[test]
    fn test_three_reading_example() {
        let series = TrendCalculator::default().compute(&readings(&[70.0, 70.5, 69.8]));

        assert_eq!(trends(&series), vec![70.0, 70.1, 70.0]);
        assert_eq!(series.current, Some(70.0));
        assert_eq!(series.previous, Some(70.1));
        assert_eq!(series.points[1].raw_weight_kg, Some(70.5));
    }

    #[test]
    fn test_empty_readings() {
        let series = TrendCalculator::default().compute(&[]);

        assert!(series.is_empty());
        assert_eq!(series.current, None);
        assert_eq!(series.previous, None);
    }

    #[test]
    fn test_single_reading() {
        let series = TrendCalculator::default().compute(&readings(&[72.46]));

        assert_eq!(series.len(), 1);
        assert_eq!(series.current, Some(72.5));
        assert_eq!(series.previous, Some(72.5));
    }

    #[test]
    fn test_recompute_is_identical() {
        let input = readings(&[81.2, 80.9, 81.4, 80.7, 80.1, 80.3, 79.8, 79.9]);
        let calculator = TrendCalculator::default();

        let first = calculator.compute(&input);
        let second = calculator.compute(&input);

        assert_eq!(first, second);
        for (a, b) in first.points.iter().zip(second.points.iter()) {
            assert_eq!(a.trend_kg.to_bits(), b.trend_kg.to_bits());
        }
    }

    #[test]
    fn test_trend_stays_within_reading_bounds() {
        let cases: Vec<Vec<f64>> = vec![
            vec![70.0, 70.5, 69.8],
            vec![95.0, 60.0, 95.0, 60.0],
            vec![55.5; 10],
            vec![80.0, 79.5, 79.0, 78.5, 78.0, 77.5, 77.0],
            vec![60.1, 60.2, 90.9, 60.3],
        ];

        for weights in cases {
            let min = weights.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let series = TrendCalculator::default().compute(&readings(&weights));

            for point in &series.points {
                assert!(
                    point.trend_kg >= min && point.trend_kg <= max,
                    "{} outside [{}, {}]",
                    point.trend_kg,
                    min,
                    max
                );
            }
        }
    }

    #[test]
    fn test_gap_steps_once_per_reading() {
        let input = vec![
            WeightReading::new(day(0), 80.0),
            WeightReading::new(day(30), 70.0),
        ];
        let series = TrendCalculator::default().compute(&input);

        // 80 * 0.9 + 70 * 0.1
        assert_eq!(series.current, Some(79.0));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_by_date() {
        let ordered = readings(&[70.0, 70.5, 69.8]);
        let mut shuffled = ordered.clone();
        shuffled.swap(0, 2);

        let calculator = TrendCalculator::default();
        assert_eq!(calculator.compute(&shuffled), calculator.compute(&ordered));
    }

    #[test]
    fn test_alpha_one_tracks_raw_weight() {
        let series = TrendCalculator::new(1.0).compute(&readings(&[70.0, 72.0, 71.0]));
        assert_eq!(trends(&series), vec![70.0, 72.0, 71.0]);
    }

    #[test]
    fn test_summary_empty_series() {
        let summary = summarize(&TrendSeries::default());

        assert_eq!(summary.current_trend_kg, None);
        assert_eq!(summary.trend_kg_week_ago, None);
        assert_eq!(summary.delta_kg, 0.0);
        assert_eq!(summary.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_summary_single_point_is_flat() {
        let series = TrendCalculator::default().compute(&readings(&[68.0]));
        let summary = summarize(&series);

        assert_eq!(summary.current_trend_kg, Some(68.0));
        assert_eq!(summary.trend_kg_week_ago, Some(68.0));
        assert_eq!(summary.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_summary_uses_point_a_week_back() {
        // 15 daily readings falling 0.2 kg a day
        let weights: Vec<f64> = (0..15).map(|i| 80.0 - 0.2 * i as f64).collect();
        let series = TrendCalculator::default().compute(&readings(&weights));
        let summary = summarize(&series);

        // last point is day 14, so the comparison point is day 7
        assert_eq!(summary.trend_kg_week_ago, Some(series.points[7].trend_kg));
        assert_eq!(summary.direction, TrendDirection::Down);
        assert!(summary.delta_kg < -0.15);
    }

    #[test]
    fn test_summary_short_history_uses_first_point() {
        let series = TrendCalculator::default().compute(&readings(&[70.0, 74.0, 78.0]));
        let summary = summarize(&series);

        assert_eq!(summary.trend_kg_week_ago, Some(70.0));
        // 70.0 -> 70.4 -> 71.16
        assert_eq!(summary.current_trend_kg, Some(71.2));
        assert!((summary.delta_kg - 1.2).abs() < 1e-9);
        assert_eq!(summary.direction, TrendDirection::Up);
    }

    #[test]
    fn test_summary_constant_weight_is_flat() {
        let series = TrendCalculator::default().compute(&readings(&[75.0; 12]));
        let summary = summarize(&series);

        assert_eq!(summary.delta_kg, 0.0);
        assert_eq!(summary.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_summary_respects_deadband() {
        let series = TrendCalculator::default().compute(&readings(&[70.0, 72.0]));
        // 70.0 -> 70.2
        assert_eq!(summarize_with(&series, 0.15, 7).direction, TrendDirection::Up);
        assert_eq!(summarize_with(&series, 0.5, 7).direction, TrendDirection::Flat);
    }

    #[test]
    fn test_summary_near_min_date_uses_first_point() {
        let input = vec![
            WeightReading::new(NaiveDate::MIN, 70.0),
            WeightReading::new(NaiveDate::MIN + Duration::days(2), 72.0),
        ];
        let series = TrendCalculator::default().compute(&input);
        let summary = summarize(&series);

        assert_eq!(summary.trend_kg_week_ago, Some(70.0));
        assert_eq!(summary.current_trend_kg, Some(70.2));
        assert_eq!(summary.direction, TrendDirection::Up);
    }
}

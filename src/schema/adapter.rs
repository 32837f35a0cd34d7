//! Adapter for folding plate.record.v1 records into a snapshot
//!
//! Records arrive in capture order and may repeat a date (or a date and meal
//! slot). Folding applies upsert-by-date semantics and drops records that fail
//! validation, so the engine only ever sees one clean reading per day.

use crate::error::EngineError;
use crate::schema::record::*;
use crate::types::{DayBehaviorLog, Snapshot, WeightReading};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Adapter for converting input records to snapshots
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<Record>, EngineError> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Record>, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, decided by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<Record>, EngineError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Fold records into a snapshot.
    ///
    /// Invalid records are skipped. A later capture replaces an earlier one for the
    /// same date (weights) or the same date and slot (meals); equal capture times
    /// keep the record that appears later in the input.
    pub fn to_snapshot(records: &[Record], generation: u64) -> Snapshot {
        let mut readings: BTreeMap<NaiveDate, WeightReading> = BTreeMap::new();
        let mut logs: BTreeMap<NaiveDate, DayBehaviorLog> = BTreeMap::new();
        let mut skipped = 0usize;

        for (index, record) in records.iter().enumerate() {
            if let Err(e) = record.validate() {
                debug!(index, kind = record.kind(), date = %record.date(), error = %e, "skipping invalid record");
                skipped += 1;
                continue;
            }

            match record {
                Record::Weight(reading) => {
                    let replace = readings
                        .get(&reading.date)
                        .map_or(true, |existing| {
                            reading.captured_at_millis >= existing.captured_at_millis
                        });
                    if replace {
                        readings.insert(reading.date, reading.clone());
                    }
                }
                Record::Meal(meal) => {
                    let log = logs
                        .entry(meal.date)
                        .or_insert_with(|| DayBehaviorLog::new(meal.date));
                    let replace = log.meals.get(&meal.slot).map_or(true, |existing| {
                        meal.captured_at_millis >= existing.captured_at_millis
                    });
                    if replace {
                        log.meals.insert(meal.slot, meal.check());
                    }
                }
            }
        }

        debug!(
            records = records.len(),
            skipped,
            readings = readings.len(),
            logged_days = logs.len(),
            "folded records into snapshot"
        );

        Snapshot {
            generation,
            readings: readings.into_values().collect(),
            logs: logs.into_values().collect(),
        }
    }

    /// Validate a batch of records
    pub fn validate_records(records: &[Record]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    kind: record.kind(),
                    date: record.date(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub date: NaiveDate,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MealSlot;

    fn sample_ndjson() -> &'static str {
        r#"
{"kind": "weight", "date": "2026-10-14", "weight_kg": 80.2, "captured_at_millis": 100}
{"kind": "weight", "date": "2026-10-15", "weight_kg": 80.0, "captured_at_millis": 200}
{"kind": "meal", "date": "2026-10-15", "slot": "lunch", "protein_present": true, "plants_present": false, "satiety": 3, "captured_at_millis": 210}

{"kind": "weight", "date": "2026-10-16", "weight_kg": -1.0, "captured_at_millis": 300}
{"kind": "meal", "date": "2026-10-16", "slot": "breakfast", "protein_present": false, "plants_present": true, "satiety": 9, "captured_at_millis": 310}
"#
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = RecordAdapter::parse_ndjson(sample_ndjson()).unwrap();
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"kind\": \"weight\", \"date\": \"2026-10-14\", \"weight_kg\": 80.2}\nnot json";
        let err = RecordAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_detects_array() {
        let input = r#"[{"kind": "weight", "date": "2026-10-14", "weight_kg": 80.2}]"#;
        let records = RecordAdapter::parse(input).unwrap();
        assert_eq!(records.len(), 1);
        assert!(RecordAdapter::parse(sample_ndjson()).is_ok());
    }

    #[test]
    fn test_snapshot_skips_invalid_records() {
        let records = RecordAdapter::parse_ndjson(sample_ndjson()).unwrap();
        let snapshot = RecordAdapter::to_snapshot(&records, 1);

        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.readings.len(), 2);
        assert_eq!(snapshot.logs.len(), 1);
        assert!(snapshot.readings.iter().all(|r| r.weight_kg > 0.0));
    }

    #[test]
    fn test_snapshot_upserts_weight_by_date() {
        let input = r#"[
            {"kind": "weight", "date": "2026-10-15", "weight_kg": 81.0, "captured_at_millis": 500},
            {"kind": "weight", "date": "2026-10-15", "weight_kg": 79.0, "captured_at_millis": 100},
            {"kind": "weight", "date": "2026-10-14", "weight_kg": 80.0, "captured_at_millis": 50},
            {"kind": "weight", "date": "2026-10-14", "weight_kg": 80.4, "captured_at_millis": 50}
        ]"#;
        let records = RecordAdapter::parse_array(input).unwrap();
        let snapshot = RecordAdapter::to_snapshot(&records, 0);

        let weights: Vec<f64> = snapshot.readings.iter().map(|r| r.weight_kg).collect();
        // ascending by date; 10-14 tie goes to the later record, 10-15 to the later capture
        assert_eq!(weights, vec![80.4, 81.0]);
    }

    #[test]
    fn test_snapshot_upserts_meal_by_slot() {
        let input = r#"[
            {"kind": "meal", "date": "2026-10-15", "slot": "dinner", "protein_present": false, "plants_present": false, "satiety": 2, "captured_at_millis": 10},
            {"kind": "meal", "date": "2026-10-15", "slot": "dinner", "protein_present": true, "plants_present": true, "satiety": 4, "captured_at_millis": 20},
            {"kind": "meal", "date": "2026-10-15", "slot": "snack", "protein_present": false, "plants_present": true, "satiety": 3, "captured_at_millis": 30}
        ]"#;
        let records = RecordAdapter::parse_array(input).unwrap();
        let snapshot = RecordAdapter::to_snapshot(&records, 0);

        assert_eq!(snapshot.logs.len(), 1);
        let log = &snapshot.logs[0];
        assert_eq!(log.meals.len(), 2);
        assert!(log.meals[&MealSlot::Dinner].protein_present);
        assert_eq!(log.meals[&MealSlot::Dinner].satiety, 4);
    }

    #[test]
    fn test_validate_records_lists_failures() {
        let records = RecordAdapter::parse_ndjson(sample_ndjson()).unwrap();
        let failures = RecordAdapter::validate_records(&records);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 3);
        assert_eq!(failures[0].kind, "weight");
        assert_eq!(failures[1].error, ValidationError::SatietyOutOfRange(9));
    }
}

//! In-memory record book
//!
//! Reference implementation of the persistence boundary for one user. Writes
//! upsert by date (weights) or by date and slot (plate checks). Every write bumps
//! the generation and pushes a full-replacement snapshot to subscribers.

use crate::behavior::BehaviorAggregator;
use crate::error::EngineError;
use crate::schema::Record;
use crate::types::{DayBehaviorLog, MealCheck, MealSlot, Snapshot, WeightReading};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Callback receiving a snapshot after each change
pub type SnapshotCallback = Box<dyn FnMut(&Snapshot) + Send>;

/// Handle returned by [`LogBook::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct LogBook {
    readings: BTreeMap<NaiveDate, WeightReading>,
    logs: BTreeMap<NaiveDate, DayBehaviorLog>,
    generation: u64,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, SnapshotCallback)>,
}

impl fmt::Debug for LogBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBook")
            .field("readings", &self.readings.len())
            .field("logs", &self.logs.len())
            .field("generation", &self.generation)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the latest snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record the weight for a date, replacing any reading already stored for it
    pub fn log_weight(
        &mut self,
        date: NaiveDate,
        weight_kg: f64,
        captured_at_millis: i64,
    ) -> Result<(), EngineError> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(EngineError::InvalidRecord(format!(
                "weight for {date} must be a positive number of kg, got {weight_kg}"
            )));
        }

        self.readings.insert(
            date,
            WeightReading {
                date,
                weight_kg,
                captured_at_millis,
            },
        );
        self.commit();
        Ok(())
    }

    /// Record a plate check, replacing any check already stored for the slot that day
    pub fn log_meal_check(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        check: MealCheck,
    ) -> Result<(), EngineError> {
        if !check.is_valid() {
            return Err(EngineError::InvalidRecord(format!(
                "satiety for {date} {} must be 1-5, got {}",
                slot.as_str(),
                check.satiety
            )));
        }

        self.logs
            .entry(date)
            .or_insert_with(|| DayBehaviorLog::new(date))
            .meals
            .insert(slot, check);
        self.commit();
        Ok(())
    }

    /// Apply decoded records in order. Invalid records are skipped and counted.
    ///
    /// A record older than what is already stored for its date (or date and slot)
    /// is ignored, so applying a batch resolves duplicates the same way as
    /// [`RecordAdapter::to_snapshot`](crate::schema::RecordAdapter::to_snapshot).
    pub fn apply(&mut self, records: &[Record]) -> usize {
        let mut skipped = 0;
        for record in records {
            if self.is_superseded(record) {
                debug!(kind = record.kind(), date = %record.date(), "record superseded by a later capture");
                continue;
            }
            let result = match record {
                Record::Weight(reading) => {
                    self.log_weight(reading.date, reading.weight_kg, reading.captured_at_millis)
                }
                Record::Meal(meal) => self.log_meal_check(meal.date, meal.slot, meal.check()),
            };
            if let Err(e) = result {
                debug!(error = %e, "record rejected");
                skipped += 1;
            }
        }
        skipped
    }

    fn is_superseded(&self, record: &Record) -> bool {
        let stored = match record {
            Record::Weight(reading) => self.readings.get(&reading.date).map(|r| r.captured_at_millis),
            Record::Meal(meal) => self
                .logs
                .get(&meal.date)
                .and_then(|log| log.meals.get(&meal.slot))
                .map(|check| check.captured_at_millis),
        };
        stored.is_some_and(|captured| captured > record.captured_at_millis())
    }

    /// Full snapshot of the book
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            readings: self.readings.values().cloned().collect(),
            logs: self.logs.values().cloned().collect(),
        }
    }

    /// Logs within the trailing window ending at `today`
    pub fn logs_in_window(&self, window_days: u32, today: NaiveDate) -> Vec<DayBehaviorLog> {
        let start = BehaviorAggregator::new(window_days).window_start(today);
        self.logs.range(start..=today).map(|(_, log)| log.clone()).collect()
    }

    /// Subscribe to snapshots. The current snapshot is delivered immediately.
    pub fn subscribe(&mut self, mut callback: SnapshotCallback) -> SubscriptionId {
        callback(&self.snapshot());

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Stop delivering snapshots to a subscriber
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn commit(&mut self) {
        self.generation += 1;
        if self.subscribers.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        trace!(generation = snapshot.generation, subscribers = self.subscribers.len(), "publishing snapshot");
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&snapshot);
        }
    }
}

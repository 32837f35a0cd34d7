//! Feed ten days of weigh-ins and plate checks through a LogBook and print
//! the dashboard computed from the latest snapshot.
//!
//! Run with: cargo run --example weekly_dashboard

use std::sync::mpsc;

use chrono::{Duration, NaiveDate};
use plate_engine::types::{MealCheck, MealSlot, Snapshot};
use plate_engine::{DashboardProcessor, LogBook, MetabolicPlanner};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2026, 10, 1).ok_or("bad start date")?;
    let weights = [82.4, 82.1, 82.6, 81.9, 81.7, 81.8, 81.2, 81.4, 80.9, 80.8];

    let (tx, rx) = mpsc::channel();
    let mut book = LogBook::new();
    book.subscribe(Box::new(move |snapshot: &Snapshot| {
        let _ = tx.send(snapshot.clone());
    }));

    for (offset, weight) in weights.iter().enumerate() {
        let date = start + Duration::days(offset as i64);
        let captured = 1_790_000_000_000 + offset as i64 * 86_400_000;
        book.log_weight(date, *weight, captured)?;

        let check = MealCheck {
            protein_present: offset % 3 != 0,
            plants_present: offset % 2 == 0,
            satiety: 3 + (offset % 2) as u8,
            captured_at_millis: captured,
        };
        book.log_meal_check(date, MealSlot::Lunch, check)?;
    }

    let today = start + Duration::days(weights.len() as i64 - 1);
    let mut processor = DashboardProcessor::new();
    let mut latest = None;
    for snapshot in rx.try_iter() {
        if let Some(dashboard) = processor.accept(&snapshot, today) {
            latest = Some(dashboard);
        }
    }

    let dashboard = latest.ok_or("no snapshot received")?;
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    println!("Current trend: {}", dashboard.current_trend_label());

    if let Some(current) = dashboard.summary.current_trend_kg {
        let arrival = MetabolicPlanner::estimate_arrival(current, 75.0, today)?;
        println!("75 kg in about {} weeks ({})", arrival.weeks, arrival.arrival_date);
    }

    Ok(())
}

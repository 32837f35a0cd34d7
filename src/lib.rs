//! Plate Engine - On-device biometric trend and habit insight engine
//!
//! Plate turns raw daily weight readings and plate-check logs into dashboard
//! values through a deterministic pipeline: record folding → EMA trend →
//! weekly habit adherence → insight classification. A separate planner turns
//! onboarding biometrics into calorie and protein targets.
//!
//! ## Modules
//!
//! - **Dashboard Pipeline**: Recompute trend, adherence and insight from a full snapshot
//! - **Metabolic Planner**: Onboarding targets and goal-arrival estimates

pub mod behavior;
pub mod config;
pub mod error;
pub mod insight;
pub mod logbook;
pub mod metabolic;
pub mod pipeline;
pub mod schema;
pub mod trend;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use behavior::BehaviorAggregator;
pub use config::EngineConfig;
pub use error::EngineError;
pub use insight::InsightClassifier;
pub use logbook::LogBook;
pub use metabolic::MetabolicPlanner;
pub use pipeline::{
    compute_dashboard, dashboard_from_records, onboarding_from_json, plan_onboarding,
    DashboardProcessor,
};
pub use trend::TrendCalculator;

// Schema exports
pub use schema::{Record, RecordAdapter, SCHEMA_VERSION};

/// Engine version embedded in CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

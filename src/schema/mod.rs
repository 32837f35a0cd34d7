//! plate.record.v1 input schema
//!
//! This module defines the record format the engine accepts from a host: weight
//! readings and plate checks, as a JSON array or as newline-delimited JSON.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;

//! Error types for the Plate engine

use thiserror::Error;

/// Errors that can occur while decoding input or computing plans
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

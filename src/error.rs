use thiserror::Error;

use crate::types::{FactorySelector, MetricClass};

/// Errors raised by the engine itself.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The mapping table has no entry for this selector/metric combination.
    #[error("no field mapping for factory `{selector}` ({class})")]
    Unresolved {
        selector: FactorySelector,
        class: MetricClass,
    },

    #[error("invalid report layout: {0}")]
    Layout(String),

    #[error("layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures of the report source (upload collaborator).
///
/// None of these are recovered by the engine; the dashboard turns every
/// variant into the "no data" state and keeps the message for display.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file type: {0} (expected .json or .csv)")]
    UnsupportedFormat(String),

    #[error("upload rejected with status {0}")]
    Status(u16),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Malformed(err.to_string())
    }
}

use std::io;

use thiserror::Error;

/// Failures surfaced by ingestion, configuration and rendering.
///
/// A market whose changes sum to zero is not represented here: ranking treats
/// it as 0% contribution with no flags and the bundle reports itself as
/// degenerate.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read input: {0}")]
    Ingestion(String),

    #[error("required column(s) missing from input: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write output: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::Ingestion(e.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Output(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

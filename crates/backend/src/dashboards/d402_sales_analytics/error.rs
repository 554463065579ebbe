use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Dataset could not be turned into a sales table. Fatal for the load,
/// no partial table is ever produced.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("cannot read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("line {row}: unparseable Order_Date '{value}'")]
    InvalidDate { row: u64, value: String },

    #[error("line {row}: invalid {column} value '{value}'")]
    InvalidValue {
        row: u64,
        column: &'static str,
        value: String,
    },

    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

/// Requested date range is inverted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date range: start {start} is after end {end}")]
pub struct InvalidRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Error)]
pub enum SalesError {
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("dataset is not initialized")]
    NotInitialized,
}

impl SalesError {
    /// True when the caller sent bad criteria and should keep its previous ones
    pub fn is_client_error(&self) -> bool {
        matches!(self, SalesError::InvalidRange(_) | SalesError::InvalidRequest(_))
    }
}

//! File normalization, result coercion and the embedded engine

pub mod coerce;
pub mod config;
pub mod engine;
pub mod normalize;
pub mod schema;

use arrow::error::ArrowError;
use lq_core::BridgeError;
use thiserror::Error;

// Re-exports
pub use coerce::{fix_row, fix_rows, raw_result_from_batch};
pub use config::{EngineConfig, NormalizeConfig, NullConfig};
pub use engine::{Engine, EngineFactory, SqliteEngine, SqliteEngineFactory};
pub use normalize::{normalize, normalize_with, sanitize_name, InputFormat};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema detection error: {0}")]
    SchemaDetection(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<calamine::Error> for DataError {
    fn from(error: calamine::Error) -> Self {
        DataError::Spreadsheet(error.to_string())
    }
}

/// Normalization failures as seen by a bridge caller
impl From<DataError> for BridgeError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::UnsupportedFormat(ext) => BridgeError::UnsupportedFormat(ext),
            other => BridgeError::Normalize(other.to_string()),
        }
    }
}

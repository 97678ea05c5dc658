//! The embedded analytical engine
//!
//! The engine is an opaque capability: it registers canonical files under
//! their names, describes them, and answers SQL with Arrow record batches.
//! Instances are created and used on a single background thread.

mod batch;
mod sqlite;

use arrow::record_batch::RecordBatch;
use lq_core::{CanonicalFile, ColumnDescriptor};

use crate::DataError;

pub use sqlite::{SqliteEngine, SqliteEngineFactory};

/// Analytical engine hosted by the background worker
pub trait Engine: Send {
    /// Register the file's bytes under its name, replacing any dataset
    /// already registered under that name
    fn register_file(&mut self, file: &CanonicalFile) -> Result<(), DataError>;

    /// Column names and declared types of a registered dataset
    fn describe(&mut self, name: &str) -> Result<Vec<ColumnDescriptor>, DataError>;

    /// Execute SQL text as given
    fn query(&mut self, sql: &str) -> Result<RecordBatch, DataError>;
}

/// Creates the engine during the handshake
pub trait EngineFactory: Send {
    fn open(&self) -> Result<Box<dyn Engine>, DataError>;
}

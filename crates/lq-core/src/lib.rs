//! Core types for the local query engine bridge
//! 
//! This crate provides the message protocol, value types and error taxonomy
//! shared by the data layer and the bridge.

pub mod error;
pub mod protocol;
pub mod schema;
pub mod state;
pub mod value;

// Re-export commonly used types
pub use error::{BridgeError, BridgeResult};
pub use protocol::{
    CanonicalFile, Envelope, RawField, RawResult, RawRow, RawValue, Reply,
    RequestEnvelope, RequestKind, RequestPayload, ResponseEnvelope, ResponseKind,
    ResponsePayload, SourceFile, INIT_REQUEST_ID,
};
pub use schema::{ColumnDescriptor, DatasetHandle};
pub use state::EngineLifecycleState;
pub use value::{QueryResultRow, Value};
pub use backend::TabularBackend;

pub mod backend {
    use crate::{BridgeResult, DatasetHandle, QueryResultRow, SourceFile};

    /// The two operations the presentation layer calls into
    #[async_trait::async_trait]
    pub trait TabularBackend: Send + Sync {
        /// Normalize and register a file, returning its schema
        async fn ingest(&self, file: SourceFile) -> BridgeResult<DatasetHandle>;

        /// Run SQL against registered files
        async fn query(&self, sql: &str) -> BridgeResult<Vec<QueryResultRow>>;
    }
}

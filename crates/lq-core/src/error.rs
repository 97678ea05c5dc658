//! Error taxonomy surfaced to bridge callers

use thiserror::Error;

/// Errors that reach a caller of `ingest` or `query`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("could not normalize file: {0}")]
    Normalize(String),

    #[error("engine not ready: {0}")]
    NotReady(String),

    #[error("engine error: {0}")]
    EngineError(String),

    #[error("channel error: {0}")]
    ChannelError(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

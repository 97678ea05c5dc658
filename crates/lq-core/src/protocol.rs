//! Message protocol spoken between the bridge and the background engine
//!
//! Every message is an [`Envelope`] of `{type, payload, id}`. Requests flow
//! toward the engine host, responses flow back; the `id` pairs each response
//! with exactly one outstanding request. Responses may arrive in any order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::ColumnDescriptor;

/// Correlation id reserved for the initial handshake
pub const INIT_REQUEST_ID: &str = "init";

/// Arrow IPC type code for date columns
pub const ARROW_TYPE_DATE: u8 = 8;

/// Arrow IPC type code for timestamp columns
pub const ARROW_TYPE_TIMESTAMP: u8 = 10;

/// A file as handed in by the caller, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension, if the name has one
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() && ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// A named byte stream in the canonical (comma separated) tabular format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFile {
    /// Identifier the engine addresses the dataset by
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Generic `{type, payload, id}` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<K, P> {
    #[serde(rename = "type")]
    pub kind: K,
    pub payload: P,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Init,
    Query,
    InsertFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Empty,
    Sql(String),
    File(CanonicalFile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    InitDone,
    QueryDone,
    InsertFileDone,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Empty,
    Message(String),
    Columns(Vec<ColumnDescriptor>),
    Rows(RawResult),
}

pub type RequestEnvelope = Envelope<RequestKind, RequestPayload>;
pub type ResponseEnvelope = Envelope<ResponseKind, ResponsePayload>;

impl Envelope<RequestKind, RequestPayload> {
    pub fn init() -> Self {
        Self {
            kind: RequestKind::Init,
            payload: RequestPayload::Empty,
            id: INIT_REQUEST_ID.to_string(),
        }
    }
}

impl Envelope<ResponseKind, ResponsePayload> {
    pub fn init_done(id: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::InitDone,
            payload: ResponsePayload::Empty,
            id: id.into(),
        }
    }

    pub fn query_done(id: impl Into<String>, result: RawResult) -> Self {
        Self {
            kind: ResponseKind::QueryDone,
            payload: ResponsePayload::Rows(result),
            id: id.into(),
        }
    }

    pub fn insert_file_done(id: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            kind: ResponseKind::InsertFileDone,
            payload: ResponsePayload::Columns(columns),
            id: id.into(),
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Error,
            payload: ResponsePayload::Message(message.into()),
            id: id.into(),
        }
    }
}

/// A response that can settle one pending request
pub trait Reply {
    type Payload;

    fn id(&self) -> &str;

    /// Split into the success payload or the failure message
    fn into_outcome(self) -> Result<Self::Payload, String>;
}

impl Reply for ResponseEnvelope {
    type Payload = ResponsePayload;

    fn id(&self) -> &str {
        &self.id
    }

    fn into_outcome(self) -> Result<ResponsePayload, String> {
        match (self.kind, self.payload) {
            (ResponseKind::Error, ResponsePayload::Message(message)) => Err(message),
            (ResponseKind::Error, _) => Err("engine reported an error without a message".to_string()),
            (_, payload) => Ok(payload),
        }
    }
}

/// A cell as produced by the engine, before coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Null,
    Boolean(bool),
    Number(f64),
    /// Integer or decimal wider than a double holds exactly, as decimal text
    WideInt(String),
    Text(String),
    Structured(serde_json::Value),
}

/// Name and Arrow type code of one result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    pub type_id: u8,
}

impl RawField {
    pub fn new(name: impl Into<String>, type_id: u8) -> Self {
        Self {
            name: name.into(),
            type_id,
        }
    }
}

pub type RawRow = IndexMap<String, RawValue>;

/// Typed tabular response to a `QUERY`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub fields: Vec<RawField>,
    pub rows: Vec<RawRow>,
}

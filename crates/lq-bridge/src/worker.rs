//! Engine host: the background side of the channel
//!
//! The worker owns the engine and processes requests strictly one at a time
//! on its own thread. Every request gets exactly one response, failures
//! included.

use std::thread::{self, JoinHandle};

use lq_core::{RequestEnvelope, RequestKind, RequestPayload, ResponseEnvelope};
use lq_data::{raw_result_from_batch, DataError, Engine, EngineFactory};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Reply text for requests that arrive before the handshake
pub const NOT_INITIALIZED: &str = "engine not initialized";

pub struct EngineWorker<F: EngineFactory> {
    factory: F,
    requests: UnboundedReceiver<RequestEnvelope>,
    responses: UnboundedSender<ResponseEnvelope>,
    engine: Option<Box<dyn Engine>>,
}

impl<F: EngineFactory + 'static> EngineWorker<F> {
    pub fn new(
        factory: F,
        requests: UnboundedReceiver<RequestEnvelope>,
        responses: UnboundedSender<ResponseEnvelope>,
    ) -> Self {
        Self {
            factory,
            requests,
            responses,
            engine: None,
        }
    }

    /// Run the worker on a dedicated thread until the request side closes
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("lq-engine".to_string())
            .spawn(move || self.run())
    }

    pub fn run(mut self) {
        info!("Engine worker started");
        while let Some(request) = self.requests.blocking_recv() {
            let response = self.handle(request);
            if self.responses.send(response).is_err() {
                debug!("Response side closed, stopping engine worker");
                break;
            }
        }
        info!("Engine worker stopped");
    }

    /// Produce the single response for one request
    pub fn handle(&mut self, request: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope { kind, payload, id } = request;
        debug!("Handling {:?} {}", kind, id);

        if kind == RequestKind::Init {
            return match self.initialize() {
                Ok(()) => ResponseEnvelope::init_done(id),
                Err(e) => {
                    warn!("Engine failed to start: {}", e);
                    ResponseEnvelope::error(id, e.to_string())
                }
            };
        }

        let Some(engine) = self.engine.as_mut() else {
            return ResponseEnvelope::error(id, NOT_INITIALIZED);
        };

        let outcome = match (kind, payload) {
            (RequestKind::InsertFile, RequestPayload::File(file)) => engine
                .register_file(&file)
                .and_then(|()| engine.describe(&file.name))
                .map(|columns| ResponseEnvelope::insert_file_done(id.clone(), columns)),
            (RequestKind::Query, RequestPayload::Sql(sql)) => engine
                .query(&sql)
                .map(|batch| ResponseEnvelope::query_done(id.clone(), raw_result_from_batch(&batch))),
            (kind, _) => Ok(ResponseEnvelope::error(
                id.clone(),
                format!("malformed {:?} request", kind),
            )),
        };

        outcome.unwrap_or_else(|e| {
            warn!("Request {} failed: {}", id, e);
            ResponseEnvelope::error(id, e.to_string())
        })
    }

    /// A repeated INIT keeps the engine that is already open
    fn initialize(&mut self) -> Result<(), DataError> {
        if self.engine.is_none() {
            self.engine = Some(self.factory.open()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lq_core::{CanonicalFile, ColumnDescriptor, Reply, ResponseKind, ResponsePayload};
    use lq_data::{EngineConfig, SqliteEngineFactory};
    use tokio::sync::mpsc;

    fn worker() -> EngineWorker<SqliteEngineFactory> {
        let (_request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, _response_rx) = mpsc::unbounded_channel();
        EngineWorker::new(SqliteEngineFactory::new(EngineConfig::default()), request_rx, response_tx)
    }

    fn request(kind: RequestKind, payload: RequestPayload, id: &str) -> RequestEnvelope {
        RequestEnvelope {
            kind,
            payload,
            id: id.to_string(),
        }
    }

    fn insert(name: &str, text: &str, id: &str) -> RequestEnvelope {
        let file = CanonicalFile {
            name: name.to_string(),
            bytes: text.as_bytes().to_vec(),
        };
        request(RequestKind::InsertFile, RequestPayload::File(file), id)
    }

    fn query(sql: &str, id: &str) -> RequestEnvelope {
        request(RequestKind::Query, RequestPayload::Sql(sql.to_string()), id)
    }

    #[test]
    fn test_requests_before_init_are_rejected() {
        let mut worker = worker();
        let response = worker.handle(query("SELECT 1", "q1"));

        assert_eq!(response.kind, ResponseKind::Error);
        assert_eq!(response.into_outcome(), Err(NOT_INITIALIZED.to_string()));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut worker = worker();
        assert_eq!(worker.handle(RequestEnvelope::init()), ResponseEnvelope::init_done("init"));
        worker.handle(insert("t.csv", "a\n1\n", "i1"));

        // A second handshake must not discard registered data
        assert_eq!(worker.handle(RequestEnvelope::init()).kind, ResponseKind::InitDone);
        assert_eq!(worker.handle(query("SELECT a FROM 't.csv'", "q1")).kind, ResponseKind::QueryDone);
    }

    #[test]
    fn test_insert_file_replies_with_columns() {
        let mut worker = worker();
        worker.handle(RequestEnvelope::init());

        let response = worker.handle(insert("people.csv", "name,age\nana,31\nbo,27\n", "i1"));
        assert_eq!(response.id, "i1");
        assert_eq!(
            response.into_outcome(),
            Ok(ResponsePayload::Columns(vec![
                ColumnDescriptor::new("name", "VARCHAR"),
                ColumnDescriptor::new("age", "BIGINT"),
            ]))
        );
    }

    #[test]
    fn test_query_replies_with_rows() {
        let mut worker = worker();
        worker.handle(RequestEnvelope::init());
        worker.handle(insert("people.csv", "name,age\nana,31\nbo,27\n", "i1"));

        let response = worker.handle(query("SELECT name FROM 'people.csv' ORDER BY age", "q1"));
        let Ok(ResponsePayload::Rows(result)) = response.into_outcome() else {
            panic!("expected rows");
        };
        assert_eq!(result.fields.len(), 1);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["name"], lq_core::RawValue::Text("bo".to_string()));
    }

    #[test]
    fn test_engine_failure_becomes_error_reply() {
        let mut worker = worker();
        worker.handle(RequestEnvelope::init());

        let response = worker.handle(query("SELECT * FROM 'missing.csv'", "q9"));
        assert_eq!(response.id, "q9");
        assert_eq!(response.kind, ResponseKind::Error);
    }

    #[test]
    fn test_mismatched_payload_is_malformed() {
        let mut worker = worker();
        worker.handle(RequestEnvelope::init());

        let response = worker.handle(request(RequestKind::Query, RequestPayload::Empty, "q1"));
        assert_eq!(response.kind, ResponseKind::Error);
        assert_eq!(response.into_outcome(), Err("malformed Query request".to_string()));
    }
}

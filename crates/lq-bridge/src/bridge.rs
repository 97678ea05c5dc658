//! The caller-facing bridge
//!
//! Requests are only sent once the handshake has completed. Before that,
//! `ingest` and `query` fail immediately with [`BridgeError::NotReady`].

use std::sync::Arc;

use async_trait::async_trait;
use lq_core::{
    BridgeError, BridgeResult, CanonicalFile, DatasetHandle, EngineLifecycleState, QueryResultRow,
    Reply, RequestEnvelope, RequestKind, RequestPayload, ResponseEnvelope, ResponseKind, ResponsePayload,
    SourceFile, TabularBackend, INIT_REQUEST_ID,
};
use lq_data::{fix_rows, normalize_with, EngineFactory, NormalizeConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{MessageChannel, UnboundedChannel};
use crate::correlator::RequestCorrelator;
use crate::worker::EngineWorker;

type Correlator = RequestCorrelator<RequestKind, RequestPayload, ResponsePayload>;

/// State shared with the dispatcher task
struct Shared {
    channel: Arc<dyn MessageChannel<RequestEnvelope>>,
    correlator: Correlator,
    state: watch::Sender<EngineLifecycleState>,
}

impl Shared {
    fn on_response(&self, response: ResponseEnvelope) {
        if response.id == INIT_REQUEST_ID {
            self.on_handshake(response);
        } else {
            self.correlator.on_message(response);
        }
    }

    fn on_handshake(&self, response: ResponseEnvelope) {
        if !matches!(response.kind, ResponseKind::InitDone | ResponseKind::Error) {
            debug!("Ignoring {:?} reply to the handshake", response.kind);
            return;
        }

        let outcome = response.into_outcome();
        let settled = self.state.send_if_modified(|state| {
            if *state != EngineLifecycleState::Initializing {
                return false;
            }
            *state = match outcome {
                Ok(_) => EngineLifecycleState::Ready,
                Err(message) => EngineLifecycleState::Failed(message),
            };
            true
        });

        if !settled {
            debug!("Ignoring handshake response outside of initialization");
            return;
        }
        match &*self.state.borrow() {
            EngineLifecycleState::Failed(reason) => warn!("Engine failed to start: {}", reason),
            _ => info!("Engine ready"),
        }
    }
}

async fn dispatch(shared: Arc<Shared>, mut responses: mpsc::UnboundedReceiver<ResponseEnvelope>) {
    while let Some(response) = responses.recv().await {
        shared.on_response(response);
    }
    debug!("Engine response channel closed");
}

/// Asynchronous facade over one background engine
pub struct EngineBridge {
    shared: Arc<Shared>,
    normalize_config: NormalizeConfig,
    dispatcher: JoinHandle<()>,
}

impl EngineBridge {
    /// Wire the bridge to an engine host. `channel` carries requests to the
    /// host and `responses` carries everything the host sends back.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        channel: Arc<dyn MessageChannel<RequestEnvelope>>,
        responses: mpsc::UnboundedReceiver<ResponseEnvelope>,
    ) -> Self {
        let (state, _) = watch::channel(EngineLifecycleState::Uninitialized);
        let shared = Arc::new(Shared {
            correlator: RequestCorrelator::new(channel.clone()),
            channel,
            state,
        });
        let dispatcher = tokio::spawn(dispatch(shared.clone(), responses));

        Self {
            shared,
            normalize_config: NormalizeConfig::default(),
            dispatcher,
        }
    }

    /// Start an [`EngineWorker`] on its own thread and begin the handshake
    pub fn spawn<F: EngineFactory + 'static>(factory: F) -> BridgeResult<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        EngineWorker::new(factory, request_rx, response_tx)
            .spawn()
            .map_err(|e| BridgeError::ChannelError(format!("could not start engine thread: {}", e)))?;

        let bridge = Self::new(Arc::new(UnboundedChannel::new(request_tx)), response_rx);
        bridge.init()?;
        Ok(bridge)
    }

    pub fn with_normalize_config(mut self, config: NormalizeConfig) -> Self {
        self.normalize_config = config;
        self
    }

    /// Begin the handshake. Only the first call sends `INIT`.
    pub fn init(&self) -> BridgeResult<()> {
        let started = self.shared.state.send_if_modified(|state| {
            if *state != EngineLifecycleState::Uninitialized {
                return false;
            }
            *state = EngineLifecycleState::Initializing;
            true
        });
        if !started {
            return Ok(());
        }

        info!("Starting engine handshake");
        if let Err(e) = self.shared.channel.post(RequestEnvelope::init()) {
            self.shared.state.send_replace(EngineLifecycleState::Failed(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    /// Start the handshake if needed and wait for it to settle
    pub async fn wait_ready(&self) -> BridgeResult<()> {
        self.init()?;

        let mut state = self.shared.state.subscribe();
        let settled = state
            .wait_for(|s| s.is_settled())
            .await
            .map_err(|_| BridgeError::ChannelError("engine state is gone".to_string()))?;

        match &*settled {
            EngineLifecycleState::Ready => Ok(()),
            other => Err(BridgeError::NotReady(other.not_ready_reason())),
        }
    }

    pub fn state(&self) -> EngineLifecycleState {
        self.shared.state.borrow().clone()
    }

    /// Requests sent but not yet answered
    pub fn pending_requests(&self) -> usize {
        self.shared.correlator.pending_count()
    }

    fn ensure_ready(&self) -> BridgeResult<()> {
        let state = self.shared.state.borrow();
        if state.is_ready() {
            Ok(())
        } else {
            Err(BridgeError::NotReady(state.not_ready_reason()))
        }
    }

    /// Register an already normalized file and return its schema
    pub async fn ingest_canonical(&self, file: CanonicalFile) -> BridgeResult<DatasetHandle> {
        self.ensure_ready()?;

        let file_name = file.name.clone();
        let completion = self
            .shared
            .correlator
            .send(RequestKind::InsertFile, RequestPayload::File(file))?;

        match completion.await? {
            ResponsePayload::Columns(columns) => {
                info!("Ingested {} with {} columns", file_name, columns.len());
                Ok(DatasetHandle { file_name, columns })
            }
            other => Err(unexpected(RequestKind::InsertFile, &other)),
        }
    }

    /// Run SQL as given and return coerced rows
    pub async fn query(&self, sql: &str) -> BridgeResult<Vec<QueryResultRow>> {
        self.ensure_ready()?;

        let completion = self
            .shared
            .correlator
            .send(RequestKind::Query, RequestPayload::Sql(sql.to_string()))?;

        match completion.await? {
            ResponsePayload::Rows(result) => Ok(fix_rows(result)),
            other => Err(unexpected(RequestKind::Query, &other)),
        }
    }
}

fn unexpected(kind: RequestKind, payload: &ResponsePayload) -> BridgeError {
    BridgeError::ChannelError(format!("unexpected response to {:?}: {:?}", kind, payload))
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

#[async_trait]
impl TabularBackend for EngineBridge {
    async fn ingest(&self, file: SourceFile) -> BridgeResult<DatasetHandle> {
        let canonical = normalize_with(&file, &self.normalize_config)?;
        self.ingest_canonical(canonical).await
    }

    async fn query(&self, sql: &str) -> BridgeResult<Vec<QueryResultRow>> {
        EngineBridge::query(self, sql).await
    }
}

//! Request/response multiplexing by correlation id

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use ahash::AHashMap;
use lq_core::{BridgeError, BridgeResult, Envelope, Reply};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::channel::MessageChannel;

/// Settles when the response for one request arrives
#[derive(Debug)]
pub struct Completion<T> {
    id: String,
    receiver: oneshot::Receiver<BridgeResult<T>>,
}

impl<T> Completion<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> Future for Completion<T> {
    type Output = BridgeResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BridgeError::ChannelError(format!(
                "request {} was dropped before a response arrived",
                this.id
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Table from correlation id to a one-shot completion sink. Knows nothing
/// about what the requests mean; `K` and `P` are the outbound kind and
/// payload, `T` the success payload of a response.
///
/// There is no timeout: a request that never gets a response stays pending.
pub struct RequestCorrelator<K, P, T> {
    channel: Arc<dyn MessageChannel<Envelope<K, P>>>,
    pending: Mutex<AHashMap<String, oneshot::Sender<BridgeResult<T>>>>,
}

impl<K, P, T> RequestCorrelator<K, P, T> {
    pub fn new(channel: Arc<dyn MessageChannel<Envelope<K, P>>>) -> Self {
        Self {
            channel,
            pending: Mutex::new(AHashMap::new()),
        }
    }

    /// Register a fresh id and transmit `{kind, payload, id}`
    pub fn send(&self, kind: K, payload: P) -> BridgeResult<Completion<T>> {
        let (sender, receiver) = oneshot::channel();

        // The entry must exist before the message leaves, a fast engine may
        // answer before `post` returns
        let id = {
            let mut pending = self.pending.lock();
            let mut id = Uuid::new_v4().to_string();
            while pending.contains_key(&id) {
                id = Uuid::new_v4().to_string();
            }
            pending.insert(id.clone(), sender);
            id
        };

        if let Err(e) = self.channel.post(Envelope { kind, payload, id: id.clone() }) {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        debug!("Sent request {}", id);
        Ok(Completion { id, receiver })
    }

    /// Settle the pending request the reply belongs to. Replies without a
    /// pending request are dropped. Returns whether a request was settled.
    pub fn on_message<R>(&self, reply: R) -> bool
    where
        R: Reply<Payload = T>,
    {
        let Some(sink) = self.pending.lock().remove(reply.id()) else {
            trace!("Ignoring response for unknown request {}", reply.id());
            return false;
        };

        let outcome = reply.into_outcome().map_err(BridgeError::EngineError);
        // The caller may have stopped waiting
        let _ = sink.send(outcome);
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

//! Outbound side of the message channel

use lq_core::{BridgeError, BridgeResult};
use tokio::sync::mpsc;

/// Transmits messages toward the engine host
pub trait MessageChannel<M>: Send + Sync {
    fn post(&self, message: M) -> BridgeResult<()>;
}

/// Channel backed by an unbounded tokio mpsc sender
pub struct UnboundedChannel<M> {
    sender: mpsc::UnboundedSender<M>,
}

impl<M> UnboundedChannel<M> {
    pub fn new(sender: mpsc::UnboundedSender<M>) -> Self {
        Self { sender }
    }
}

impl<M: Send> MessageChannel<M> for UnboundedChannel<M> {
    fn post(&self, message: M) -> BridgeResult<()> {
        self.sender
            .send(message)
            .map_err(|_| BridgeError::ChannelError("engine host is no longer receiving".to_string()))
    }
}

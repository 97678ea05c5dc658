//! Asynchronous bridge to the background analytical engine
//!
//! The bridge owns one engine instance running on its own thread and talks
//! to it over a single pair of channels. Concurrent requests are multiplexed
//! by correlation id, so responses may come back in any order.

pub mod bridge;
pub mod channel;
pub mod correlator;
pub mod worker;

// Re-exports
pub use bridge::EngineBridge;
pub use channel::{MessageChannel, UnboundedChannel};
pub use correlator::{Completion, RequestCorrelator};
pub use worker::EngineWorker;

//! Configuration for normalization and the engine

pub mod engine_config;
pub mod normalize_config;
pub mod null_handling;

pub use engine_config::*;
pub use normalize_config::*;
pub use null_handling::*;

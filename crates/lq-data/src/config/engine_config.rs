//! Engine configuration

use serde::{Serialize, Deserialize};

use super::null_handling::NullConfig;

/// Configuration of the embedded engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows sampled for column type detection on registration
    pub sample_size: usize,

    /// Page cache size in KiB
    pub cache_size_kib: Option<i64>,

    /// Null handling for registered files
    pub null_config: NullConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            cache_size_kib: None,
            null_config: NullConfig::default(),
        }
    }
}

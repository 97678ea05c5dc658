//! Settings for turning input files into the canonical format

use serde::{Serialize, Deserialize};

/// Extension every canonical file carries
pub const CANONICAL_EXTENSION: &str = "csv";

/// Field separator of every canonical file
pub const CANONICAL_DELIMITER: u8 = b',';

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Replaces characters that are unsafe in a dataset name
    pub placeholder: char,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            placeholder: '_',
        }
    }
}

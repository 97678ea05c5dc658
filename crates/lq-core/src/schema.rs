//! Dataset schema as reported after ingestion

use serde::{Deserialize, Serialize};

/// Declared type families that can be aggregated numerically
const NUMERIC_TYPES: &[&str] = &["BIGINT", "DOUBLE", "INTEGER", "DECIMAL", "HUGEINT"];

/// One column of an ingested dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(alias = "column_name")]
    pub name: String,

    /// Declared type tag, as the engine names it
    #[serde(rename = "type", alias = "column_type")]
    pub data_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        let upper = self.data_type.to_uppercase();
        NUMERIC_TYPES.iter().any(|t| upper.contains(t))
    }
}

/// The caller's reference to an ingested dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetHandle {
    pub file_name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl DatasetHandle {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_numeric())
    }
}

//! Column type detection for registered files

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value as SqlValue;

use crate::config::NullConfig;

/// Timestamp layouts recognized in text cells
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared type of a registered column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Date,
    Timestamp,
    Varchar,
}

impl ColumnType {
    /// Type name used in the table definition and reported by describe
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Convert one non-null cell for storage. Cells that do not fit the
    /// column type are stored as text.
    pub fn to_sql_value(&self, value: &str) -> SqlValue {
        let text = value.trim();
        let converted = match self {
            ColumnType::Boolean => parse_bool(text).map(|b| SqlValue::Integer(b as i64)),
            ColumnType::BigInt => text.parse::<i64>().ok().map(SqlValue::Integer),
            ColumnType::Double => text.parse::<f64>().ok().map(SqlValue::Real),
            ColumnType::Date => parse_date(text).map(|d| SqlValue::Text(d.format(DATE_FORMAT).to_string())),
            ColumnType::Timestamp => parse_timestamp(text)
                .map(|ts| SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
            ColumnType::Varchar => None,
        };
        converted.unwrap_or_else(|| SqlValue::Text(value.to_string()))
    }
}

/// Statistics gathered while detecting a column
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub null_count: usize,
    pub value_count: usize,
}

/// Schema detector for analyzing data and determining column types
pub struct SchemaDetector {
    sample_size: usize,
    null_config: NullConfig,
}

impl SchemaDetector {
    /// Create a new schema detector
    pub fn new() -> Self {
        Self {
            sample_size: 1000,
            null_config: NullConfig::default(),
        }
    }
    
    /// Set the sample size for detection
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_null_config(mut self, null_config: NullConfig) -> Self {
        self.null_config = null_config;
        self
    }

    pub fn null_config(&self) -> &NullConfig {
        &self.null_config
    }
    
    /// Detect one type per header from the leading sample rows
    pub fn detect_from_samples(&self, headers: &[String], samples: &[Vec<String>]) -> Vec<(ColumnType, ColumnStats)> {
        let samples = &samples[..samples.len().min(self.sample_size)];
        (0..headers.len())
            .map(|col_idx| self.analyze_column(samples, col_idx))
            .collect()
    }
    
    /// Analyze a single column
    fn analyze_column(&self, samples: &[Vec<String>], col_idx: usize) -> (ColumnType, ColumnStats) {
        let mut stats = ColumnStats::default();
        let mut is_bool = true;
        let mut is_int = true;
        let mut is_float = true;
        let mut is_date = true;
        let mut is_timestamp = true;
        
        for row in samples {
            let value = match row.get(col_idx) {
                Some(value) if !self.null_config.is_null(value) => value.trim(),
                _ => {
                    stats.null_count += 1;
                    continue;
                }
            };
            stats.value_count += 1;

            if is_bool && parse_bool(value).is_none() {
                is_bool = false;
            }
            if is_int && value.parse::<i64>().is_err() {
                is_int = false;
            }
            if is_float && value.parse::<f64>().is_err() {
                is_float = false;
            }
            if is_date && parse_date(value).is_none() {
                is_date = false;
            }
            if is_timestamp && parse_timestamp(value).is_none() {
                is_timestamp = false;
            }
        }

        // An all-null column carries no evidence
        if stats.value_count == 0 {
            return (ColumnType::Varchar, stats);
        }
        
        let column_type = if is_bool {
            ColumnType::Boolean
        } else if is_int {
            ColumnType::BigInt
        } else if is_float {
            ColumnType::Double
        } else if is_date {
            ColumnType::Date
        } else if is_timestamp {
            ColumnType::Timestamp
        } else {
            ColumnType::Varchar
        };
        
        (column_type, stats)
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

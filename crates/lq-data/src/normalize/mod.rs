//! Normalization of input files into the canonical CSV format
//!
//! Delimited text passes through untouched. Spreadsheets contribute only
//! their first sheet; any other sheets are dropped. JSON documents are
//! flattened to one row per element.

mod json;
mod spreadsheet;

use lq_core::{CanonicalFile, SourceFile};
use tracing::debug;

use crate::config::{NormalizeConfig, CANONICAL_EXTENSION};
use crate::DataError;

/// Characters of the produced CSV shown in the debug preview
const PREVIEW_CHARS: usize = 100;

/// Recognized input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Xlsx,
    Xls,
    Json,
}

impl InputFormat {
    /// Detect the format from the file's extension
    pub fn detect(file: &SourceFile) -> Result<Self, DataError> {
        match file.extension().as_deref() {
            Some("csv") => Ok(InputFormat::Delimited),
            Some("xlsx") => Ok(InputFormat::Xlsx),
            Some("xls") => Ok(InputFormat::Xls),
            Some("json") => Ok(InputFormat::Json),
            Some(other) => Err(DataError::UnsupportedFormat(format!(".{}", other))),
            None => Err(DataError::UnsupportedFormat(file.name.clone())),
        }
    }
}

/// Normalize with the default configuration
pub fn normalize(file: &SourceFile) -> Result<CanonicalFile, DataError> {
    normalize_with(file, &NormalizeConfig::default())
}

/// Convert `file` to the canonical format under a sanitized name
pub fn normalize_with(file: &SourceFile, config: &NormalizeConfig) -> Result<CanonicalFile, DataError> {
    let format = InputFormat::detect(file)?;
    let name = sanitize_name(&file.name, config.placeholder);

    let bytes = match format {
        InputFormat::Delimited => {
            debug!("Passing {} through as {}", file.name, name);
            return Ok(CanonicalFile {
                name,
                bytes: file.bytes.clone(),
            });
        }
        InputFormat::Xlsx => spreadsheet::xlsx_to_csv(&file.bytes)?,
        InputFormat::Xls => spreadsheet::xls_to_csv(&file.bytes)?,
        InputFormat::Json => json::json_to_csv(&file.bytes)?,
    };

    let preview: String = String::from_utf8_lossy(&bytes).chars().take(PREVIEW_CHARS).collect();
    debug!("Normalized {} ({:?}) to {}: {:?}", file.name, format, name, preview);

    Ok(CanonicalFile { name, bytes })
}

/// Lowercase the name, replace anything outside `[a-z0-9.]` with
/// `placeholder`, and give converted formats the canonical extension
pub fn sanitize_name(name: &str, placeholder: char) -> String {
    let safe: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' { c } else { placeholder })
        .collect();

    for ext in [".xlsx", ".xls", ".json"] {
        if let Some(stem) = safe.strip_suffix(ext) {
            return format!("{}.{}", stem, CANONICAL_EXTENSION);
        }
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe_name(name: &str) -> bool {
        name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_')
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Ventas 2024 (Q1).CSV", '_'), "ventas_2024__q1_.csv");
        assert_eq!(sanitize_name("Report.XLSX", '_'), "report.csv");
        assert_eq!(sanitize_name("legacy.xls", '_'), "legacy.csv");
        assert_eq!(sanitize_name("events.json", '_'), "events.csv");
        assert_eq!(sanitize_name("año.csv", '_'), "a_o.csv");
    }

    #[test]
    fn test_csv_passes_through_unchanged() {
        let bytes = b"Region,Units\nnorth,3\n".to_vec();
        let file = SourceFile::new("My Sales.csv", bytes.clone());

        let canonical = normalize(&file).unwrap();
        assert_eq!(canonical.name, "my_sales.csv");
        assert_eq!(canonical.bytes, bytes);
        // The caller's file is left alone
        assert_eq!(file.name, "My Sales.csv");
    }

    #[test]
    fn test_json_is_converted() {
        let file = SourceFile::new("Orders.JSON", br#"[{"id": 1, "sku": "A"}, {"id": 2, "sku": "B"}]"#.to_vec());

        let canonical = normalize(&file).unwrap();
        assert_eq!(canonical.name, "orders.csv");
        assert!(canonical.name.ends_with(".csv"));
        assert!(is_safe_name(&canonical.name));
        assert_eq!(String::from_utf8(canonical.bytes).unwrap(), "id,sku\n1,A\n2,B\n");
    }

    #[test]
    fn test_workbook_is_converted() {
        let bytes = include_bytes!("../../tests/fixtures/two_sheets.xlsx").to_vec();
        let file = SourceFile::new("Q1 Orders.XLSX", bytes);

        let canonical = normalize(&file).unwrap();
        assert_eq!(canonical.name, "q1_orders.csv");
        assert!(is_safe_name(&canonical.name));
        assert_eq!(String::from_utf8(canonical.bytes).unwrap(), "sku,units\nA-1,3\nB-2,4.5\n");
    }

    #[test]
    fn test_legacy_workbook_is_detected() {
        let file = SourceFile::new("Legacy Report.xls", b"not an ole file".to_vec());
        assert_eq!(InputFormat::detect(&file).unwrap(), InputFormat::Xls);
        assert_eq!(sanitize_name(&file.name, '_'), "legacy_report.csv");
        assert!(matches!(normalize(&file), Err(DataError::Spreadsheet(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        for name in ["data.parquet", "notes.txt", "noextension"] {
            let file = SourceFile::new(name, b"whatever".to_vec());
            match normalize(&file) {
                Err(DataError::UnsupportedFormat(_)) => {}
                other => panic!("expected UnsupportedFormat for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_custom_placeholder_keeps_comma_output() {
        let config = NormalizeConfig { placeholder: '-' };
        let file = SourceFile::new("Two Cols.json", br#"{"a": 1, "b": 2}"#.to_vec());

        let canonical = normalize_with(&file, &config).unwrap();
        assert_eq!(canonical.name, "two-cols.csv");
        assert_eq!(String::from_utf8(canonical.bytes).unwrap(), "a,b\n1,2\n");
    }
}

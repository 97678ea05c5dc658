//! Rendering of schemas and result rows for the terminal

use lq_core::{DatasetHandle, QueryResultRow};

/// How result rows are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Header line followed by tab separated values
    Tsv,
    /// One JSON object per row
    JsonLines,
}

pub fn format_schema(handle: &DatasetHandle) -> String {
    let mut out = format!("{} ({} columns)\n", handle.file_name, handle.column_count());
    for column in &handle.columns {
        out.push_str(&format!("  {}\t{}\n", column.name, column.data_type));
    }
    out
}

pub fn format_rows(rows: &[QueryResultRow], format: OutputFormat) -> anyhow::Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Tsv => {
            let Some(first) = rows.first() else {
                return Ok("(no rows)\n".to_string());
            };
            out.push_str(&first.keys().cloned().collect::<Vec<_>>().join("\t"));
            out.push('\n');
            for row in rows {
                let line = row.values().map(|v| v.to_string()).collect::<Vec<_>>().join("\t");
                out.push_str(&line);
                out.push('\n');
            }
        }
        OutputFormat::JsonLines => {
            for row in rows {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

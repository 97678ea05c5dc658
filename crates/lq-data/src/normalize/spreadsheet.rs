//! First-sheet extraction from XLSX/XLS workbooks

use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{Data, DataType, Reader, Xls, Xlsx};
use chrono::Timelike;

use crate::config::CANONICAL_DELIMITER;
use crate::DataError;

pub(super) fn xlsx_to_csv(bytes: &[u8]) -> Result<Vec<u8>, DataError> {
    let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|e| DataError::Spreadsheet(e.to_string()))?;
    first_sheet_to_csv(workbook)
}

pub(super) fn xls_to_csv(bytes: &[u8]) -> Result<Vec<u8>, DataError> {
    let workbook: Xls<_> = Xls::new(Cursor::new(bytes)).map_err(|e| DataError::Spreadsheet(e.to_string()))?;
    first_sheet_to_csv(workbook)
}

/// Only the first sheet in document order is read; the rest are ignored
fn first_sheet_to_csv<RS, R>(mut workbook: R) -> Result<Vec<u8>, DataError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let sheet_names = workbook.sheet_names();
    let Some(first) = sheet_names.first() else {
        return Ok(Vec::new());
    };
    if sheet_names.len() > 1 {
        tracing::debug!("Reading sheet '{}', ignoring {} others", first, sheet_names.len() - 1);
    }

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| DataError::Spreadsheet(e.to_string()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(CANONICAL_DELIMITER)
        .flexible(true)
        .from_writer(Vec::new());

    for row in range.rows() {
        writer.write_record(row.iter().map(cell_text))?;
    }

    writer
        .into_inner()
        .map_err(|e| DataError::Csv(e.to_string()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

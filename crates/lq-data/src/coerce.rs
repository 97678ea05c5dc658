//! Coercion of engine output into caller-safe values
//!
//! The engine side turns Arrow batches into a [`RawResult`]: 64-bit and
//! decimal columns travel as decimal text, temporal columns as epoch
//! milliseconds tagged with their Arrow type code. The bridge side then runs
//! [`fix_row`] over every row, which turns wide integers into plain numbers
//! and renders temporal values from their absolute UTC instant.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use chrono::DateTime;
use lq_core::protocol::{ARROW_TYPE_DATE, ARROW_TYPE_TIMESTAMP};
use lq_core::{QueryResultRow, RawField, RawResult, RawRow, RawValue, Value};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Coerce every row of a raw result
pub fn fix_rows(result: RawResult) -> Vec<QueryResultRow> {
    let RawResult { fields, rows } = result;
    rows.into_iter().map(|row| fix_row(&fields, row)).collect()
}

/// Coerce one row. Fields that are neither wide integers nor tagged as
/// temporal pass through unchanged.
pub fn fix_row(fields: &[RawField], row: RawRow) -> QueryResultRow {
    row.into_iter()
        .map(|(name, raw)| {
            let type_id = fields.iter().find(|f| f.name == name).map(|f| f.type_id);
            let value = fix_value(type_id, raw);
            (name, value)
        })
        .collect()
}

fn fix_value(type_id: Option<u8>, raw: RawValue) -> Value {
    let value = match raw {
        RawValue::Null => Value::Null,
        RawValue::Boolean(b) => Value::Boolean(b),
        RawValue::Number(n) => Value::Number(n),
        RawValue::WideInt(text) => Value::Number(wide_to_f64(&text)),
        RawValue::Text(s) => Value::Text(s),
        RawValue::Structured(v) => Value::Structured(v),
    };

    match (type_id, value) {
        (Some(ARROW_TYPE_DATE), Value::Number(ms)) => format_instant(ms, "%Y-%m-%d"),
        (Some(ARROW_TYPE_TIMESTAMP), Value::Number(ms)) => format_instant(ms, "%Y-%m-%d %H:%M:%S"),
        (_, value) => value,
    }
}

/// Zero when the text is not a finite number
fn wide_to_f64(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn format_instant(ms: f64, format: &str) -> Value {
    let instant = if ms.is_finite() {
        DateTime::from_timestamp_millis(ms as i64)
    } else {
        None
    };
    match instant {
        Some(dt) => Value::Text(dt.format(format).to_string()),
        None => Value::Number(ms),
    }
}

/// Arrow IPC type code of a data type
pub fn type_code(data_type: &DataType) -> u8 {
    match data_type {
        DataType::Null => 1,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        | DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => 2,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => 3,
        DataType::Binary => 4,
        DataType::Utf8 => 5,
        DataType::Boolean => 6,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => 7,
        DataType::Date32 | DataType::Date64 => ARROW_TYPE_DATE,
        DataType::Time32(_) | DataType::Time64(_) => 9,
        DataType::Timestamp(_, _) => ARROW_TYPE_TIMESTAMP,
        DataType::Interval(_) => 11,
        DataType::List(_) => 12,
        DataType::Struct(_) => 13,
        DataType::Union(_, _) => 14,
        DataType::FixedSizeBinary(_) => 15,
        DataType::FixedSizeList(_, _) => 16,
        DataType::Map(_, _) => 17,
        DataType::Duration(_) => 18,
        DataType::LargeBinary => 19,
        DataType::LargeUtf8 => 20,
        DataType::LargeList(_) => 21,
        _ => 0,
    }
}

/// Convert a batch into ordered row mappings tagged with field type codes
pub fn raw_result_from_batch(batch: &RecordBatch) -> RawResult {
    let schema = batch.schema();
    let fields = schema
        .fields()
        .iter()
        .map(|f| RawField::new(f.name().clone(), type_code(f.data_type())))
        .collect();

    let rows = (0..batch.num_rows())
        .map(|row_idx| {
            schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, column)| (field.name().clone(), raw_cell(column, row_idx)))
                .collect()
        })
        .collect();

    RawResult { fields, rows }
}

fn raw_cell(array: &ArrayRef, idx: usize) -> RawValue {
    if array.is_null(idx) {
        return RawValue::Null;
    }

    match array.data_type() {
        DataType::Boolean => RawValue::Boolean(array.as_boolean().value(idx)),
        DataType::Int8 => RawValue::Number(array.as_primitive::<Int8Type>().value(idx) as f64),
        DataType::Int16 => RawValue::Number(array.as_primitive::<Int16Type>().value(idx) as f64),
        DataType::Int32 => RawValue::Number(array.as_primitive::<Int32Type>().value(idx) as f64),
        DataType::UInt8 => RawValue::Number(array.as_primitive::<UInt8Type>().value(idx) as f64),
        DataType::UInt16 => RawValue::Number(array.as_primitive::<UInt16Type>().value(idx) as f64),
        DataType::UInt32 => RawValue::Number(array.as_primitive::<UInt32Type>().value(idx) as f64),
        DataType::Float32 => RawValue::Number(array.as_primitive::<Float32Type>().value(idx) as f64),
        DataType::Float64 => RawValue::Number(array.as_primitive::<Float64Type>().value(idx)),
        DataType::Int64 => RawValue::WideInt(array.as_primitive::<Int64Type>().value(idx).to_string()),
        DataType::UInt64 => RawValue::WideInt(array.as_primitive::<UInt64Type>().value(idx).to_string()),
        DataType::Decimal128(_, _) => {
            RawValue::WideInt(array.as_primitive::<Decimal128Type>().value_as_string(idx))
        }
        DataType::Date32 => {
            RawValue::Number((array.as_primitive::<Date32Type>().value(idx) as i64 * MILLIS_PER_DAY) as f64)
        }
        DataType::Date64 => RawValue::Number(array.as_primitive::<Date64Type>().value(idx) as f64),
        DataType::Timestamp(unit, _) => {
            let ms = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(idx).saturating_mul(1000),
                TimeUnit::Millisecond => array.as_primitive::<TimestampMillisecondType>().value(idx),
                TimeUnit::Microsecond => array.as_primitive::<TimestampMicrosecondType>().value(idx) / 1000,
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value(idx) / 1_000_000,
            };
            RawValue::Number(ms as f64)
        }
        DataType::Utf8 => RawValue::Text(array.as_string::<i32>().value(idx).to_string()),
        DataType::LargeUtf8 => RawValue::Text(array.as_string::<i64>().value(idx).to_string()),
        DataType::List(_) | DataType::LargeList(_) | DataType::Struct(_) => {
            RawValue::Structured(json_cell(array, idx))
        }
        _ => RawValue::Text(array_value_to_string(array, idx).unwrap_or_default()),
    }
}

/// Nested cell as JSON, recursing through lists and structs
fn json_cell(array: &ArrayRef, idx: usize) -> serde_json::Value {
    use serde_json::Value as Json;

    if array.is_null(idx) {
        return Json::Null;
    }

    match array.data_type() {
        DataType::List(_) => {
            let items = array.as_list::<i32>().value(idx);
            Json::Array((0..items.len()).map(|i| json_cell(&items, i)).collect())
        }
        DataType::LargeList(_) => {
            let items = array.as_list::<i64>().value(idx);
            Json::Array((0..items.len()).map(|i| json_cell(&items, i)).collect())
        }
        DataType::Struct(fields) => {
            let columns = array.as_struct().columns();
            Json::Object(
                fields
                    .iter()
                    .zip(columns)
                    .map(|(field, column)| (field.name().clone(), json_cell(column, idx)))
                    .collect(),
            )
        }
        _ => match raw_cell(array, idx) {
            RawValue::Null => Json::Null,
            RawValue::Boolean(b) => Json::Bool(b),
            RawValue::Number(n) => serde_json::Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null),
            RawValue::WideInt(text) | RawValue::Text(text) => Json::String(text),
            RawValue::Structured(v) => v,
        },
    }
}

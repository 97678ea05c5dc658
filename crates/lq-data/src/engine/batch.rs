//! Arrow record batches from SQLite statements

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder, StringBuilder,
    TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use rusqlite::{types::Value as SqlValue, Connection};

use crate::schema::{parse_date, parse_timestamp};
use crate::DataError;

/// Run `sql` and collect every row into one batch. Declared column types
/// decide the Arrow type when the values agree with them; computed columns
/// are typed from their values.
pub(super) fn execute(conn: &Connection, sql: &str) -> Result<RecordBatch, DataError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<(String, Option<String>)> = stmt
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.decl_type().map(|t| t.to_string())))
        .collect();

    let mut rows_data: Vec<Vec<SqlValue>> = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(row.get::<_, SqlValue>(idx)?);
        }
        rows_data.push(values);
    }

    // Statements without a result set
    if columns.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());
    for (idx, (name, decl_type)) in columns.iter().enumerate() {
        let data_type = resolve_type(decl_type.as_deref(), &rows_data, idx);
        arrays.push(build_array(&data_type, rows_data.iter().map(|row| &row[idx])));
        fields.push(Field::new(name, data_type, true));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).map_err(DataError::from)
}

/// Arrow type implied by a declared SQL type
fn declared_type(decl_type: &str) -> Option<DataType> {
    let upper = decl_type.to_uppercase();
    if upper.contains("BOOL") {
        Some(DataType::Boolean)
    } else if upper == "DATE" {
        Some(DataType::Date32)
    } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
        Some(DataType::Timestamp(TimeUnit::Millisecond, None))
    } else if upper.contains("INT") {
        Some(DataType::Int64)
    } else if ["REAL", "FLOA", "DOUB", "DEC", "NUMERIC"].iter().any(|t| upper.contains(t)) {
        Some(DataType::Float64)
    } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| upper.contains(t)) {
        Some(DataType::Utf8)
    } else {
        None
    }
}

fn fits(data_type: &DataType, value: &SqlValue) -> bool {
    match (data_type, value) {
        (_, SqlValue::Null) => true,
        (DataType::Utf8, _) => true,
        (DataType::Int64, SqlValue::Integer(_)) => true,
        (DataType::Float64, SqlValue::Integer(_) | SqlValue::Real(_)) => true,
        (DataType::Boolean, SqlValue::Integer(i)) => *i == 0 || *i == 1,
        (DataType::Date32, SqlValue::Text(t)) => parse_date(t).is_some(),
        (DataType::Timestamp(_, _), SqlValue::Text(t)) => parse_timestamp(t).is_some(),
        _ => false,
    }
}

fn resolve_type(decl_type: Option<&str>, rows: &[Vec<SqlValue>], idx: usize) -> DataType {
    if let Some(data_type) = decl_type.and_then(declared_type) {
        if rows.iter().all(|row| fits(&data_type, &row[idx])) {
            return data_type;
        }
    }

    let mut saw_integer = false;
    let mut saw_real = false;
    for row in rows {
        match &row[idx] {
            SqlValue::Null => {}
            SqlValue::Integer(_) => saw_integer = true,
            SqlValue::Real(_) => saw_real = true,
            SqlValue::Text(_) | SqlValue::Blob(_) => return DataType::Utf8,
        }
    }

    match (saw_integer, saw_real) {
        (_, true) => DataType::Float64,
        (true, false) => DataType::Int64,
        (false, false) => DataType::Utf8,
    }
}

fn build_array<'a>(data_type: &DataType, values: impl Iterator<Item = &'a SqlValue>) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for value in values {
                match value {
                    SqlValue::Integer(i) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for value in values {
                match value {
                    SqlValue::Real(f) => builder.append_value(*f),
                    SqlValue::Integer(i) => builder.append_value(*i as f64),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for value in values {
                match value {
                    SqlValue::Integer(i) => builder.append_value(*i != 0),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Date32 => {
            let mut builder = Date32Builder::new();
            for value in values {
                match value {
                    SqlValue::Text(t) => builder.append_option(parse_date(t).map(Date32Type::from_naive_date)),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Timestamp(_, _) => {
            let mut builder = TimestampMillisecondBuilder::new();
            for value in values {
                match value {
                    SqlValue::Text(t) => {
                        builder.append_option(parse_timestamp(t).map(|ts| ts.and_utc().timestamp_millis()))
                    }
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    SqlValue::Text(t) => builder.append_value(t),
                    SqlValue::Integer(i) => builder.append_value(i.to_string()),
                    SqlValue::Real(f) => builder.append_value(f.to_string()),
                    SqlValue::Blob(b) => builder.append_value(String::from_utf8_lossy(b)),
                    SqlValue::Null => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Float64Type, TimestampMillisecondType};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id BIGINT, day DATE, at TIMESTAMP, note VARCHAR);
             INSERT INTO t VALUES (1, '2024-03-05', '2024-03-05 14:30:00', 'a');
             INSERT INTO t VALUES (2, NULL, '2024-03-06 00:00:00', NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_declared_types_drive_arrow_types() {
        let batch = execute(&conn(), "SELECT id, day, at, note FROM t ORDER BY id").unwrap();
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Date32);
        assert_eq!(schema.field(2).data_type(), &DataType::Timestamp(TimeUnit::Millisecond, None));
        assert_eq!(schema.field(3).data_type(), &DataType::Utf8);

        let at = batch.column(2).as_primitive::<TimestampMillisecondType>();
        assert_eq!(at.value(0), 1_709_649_000_000);
        assert!(batch.column(1).is_null(1));
    }

    #[test]
    fn test_computed_columns_are_sniffed() {
        let batch = execute(&conn(), "SELECT AVG(id) AS mean, COUNT(*) AS n, MIN(day) AS first FROM t").unwrap();
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(batch.column(0).as_primitive::<Float64Type>().value(0), 1.5);
    }

    #[test]
    fn test_values_that_disagree_with_declaration() {
        let conn = conn();
        conn.execute("INSERT INTO t VALUES ('x9', 'soon', 'later', 3)", []).unwrap();

        let batch = execute(&conn, "SELECT id, day, note FROM t").unwrap();
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(batch.column(0).as_string::<i32>().value(2), "x9");
    }

    #[test]
    fn test_statement_without_result_set() {
        let batch = execute(&conn(), "CREATE TABLE other (x INTEGER)").unwrap();
        assert_eq!(batch.num_columns(), 0);
    }
}

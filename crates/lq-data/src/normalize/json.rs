//! JSON documents flattened to CSV rows

use indexmap::IndexSet;
use serde_json::Value;

use crate::config::CANONICAL_DELIMITER;
use crate::DataError;

/// Column used when an element is not an object
const SCALAR_COLUMN: &str = "value";

pub(super) fn json_to_csv(bytes: &[u8]) -> Result<Vec<u8>, DataError> {
    let parsed: Value = serde_json::from_slice(bytes)?;
    let elements = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    // Union of keys in first-seen order
    let mut columns: IndexSet<String> = IndexSet::new();
    for element in &elements {
        match element {
            Value::Object(map) => columns.extend(map.keys().cloned()),
            _ => {
                columns.insert(SCALAR_COLUMN.to_string());
            }
        }
    }

    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(CANONICAL_DELIMITER)
        .from_writer(Vec::new());
    writer.write_record(columns.iter())?;

    for element in &elements {
        let record: Vec<String> = columns
            .iter()
            .map(|column| match element {
                Value::Object(map) => map.get(column).map(cell_text).unwrap_or_default(),
                scalar if column == SCALAR_COLUMN => cell_text(scalar),
                _ => String::new(),
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| DataError::Csv(e.to_string()))
}

/// Scalars become their text, nested values their JSON serialization
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(json: &str) -> String {
        String::from_utf8(json_to_csv(json.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_single_object_becomes_one_row() {
        assert_eq!(convert(r#"{"name": "ana", "age": 31}"#), "name,age\nana,31\n");
    }

    #[test]
    fn test_key_union_and_missing_cells() {
        let csv = convert(r#"[{"a": 1}, {"b": true, "a": null}, {"c": "x"}]"#);
        assert_eq!(csv, "a,b,c\n1,,\n,true,\n,,x\n");
    }

    #[test]
    fn test_nested_values_are_serialized() {
        let csv = convert(r#"[{"id": 1, "tags": ["a", "b"], "meta": {"k": 2}}]"#);
        assert_eq!(csv, "id,tags,meta\n1,\"[\"\"a\"\",\"\"b\"\"]\",\"{\"\"k\"\":2}\"\n");
    }

    #[test]
    fn test_scalar_elements() {
        assert_eq!(convert("[1, 2, 3]"), "value\n1\n2\n3\n");
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(convert("[]"), "");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(json_to_csv(b"{not json"), Err(DataError::Json(_))));
    }
}

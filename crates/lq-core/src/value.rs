//! Caller-facing cell values

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One coerced cell of a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    /// Nested data left as the engine returned it
    Structured(serde_json::Value),
}

/// Column name to value, in engine column order
pub type QueryResultRow = IndexMap<String, Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            // Whole numbers print without a fractional part
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Structured(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Structured(serde_json::json!({"a": [1, 2]})).to_string(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_row_serializes_as_plain_object() {
        let mut row = QueryResultRow::new();
        row.insert("region".to_string(), Value::Text("north".to_string()));
        row.insert("total".to_string(), Value::Number(10.0));
        row.insert("flag".to_string(), Value::Null);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"region":"north","total":10.0,"flag":null}"#);
    }
}

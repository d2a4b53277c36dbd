//! Scalar values flowing through an import
//!
//! `CellValue` is what a bundle sheet hands over for one cell; `FieldValue`
//! is the typed value the normalizer produces for a canonical field.

use chrono::NaiveDate;
use serde_json::{Number, Value};
use std::fmt;

/// A raw scalar as read from a sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Build a cell from CSV text; blank text becomes `Empty`
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual rendering used for marker checks and messages
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => bool_label(*b).to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// A typed value for a canonical field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    /// Identifier of another record
    Reference(String),
    Date(NaiveDate),
}

impl FieldValue {
    /// Convert to the JSON value kept by the entity store
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) | FieldValue::Reference(s) => Value::String(s.clone()),
            FieldValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Reference(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Reference(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", format_number(*n)),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Bool(b) => write!(f, "{}", bool_label(*b)),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Spreadsheet spelling of a boolean
pub fn bool_label(b: bool) -> &'static str {
    if b {
        "SI"
    } else {
        "NO"
    }
}

/// Render a float without a trailing `.0` when it holds a whole number
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_text() {
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);
        assert_eq!(CellValue::from_text("Ana"), CellValue::Text("Ana".into()));
        assert!(CellValue::Text("   ".into()).is_empty());
    }

    #[test]
    fn test_cell_as_text() {
        assert_eq!(CellValue::Number(1001.0).as_text(), "1001");
        assert_eq!(CellValue::Number(12.5).as_text(), "12.5");
        assert_eq!(CellValue::Bool(true).as_text(), "SI");
    }

    #[test]
    fn test_field_to_json() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(FieldValue::Date(date).to_json(), Value::String("2024-02-01".into()));
        assert_eq!(FieldValue::Integer(25).to_json(), serde_json::json!(25));
        assert_eq!(FieldValue::Number(f64::NAN).to_json(), Value::Null);
        assert_eq!(FieldValue::Bool(false).to_string(), "NO");
    }
}

//! Stored entity records
//!
//! The store keeps every entity as a flat JSON object. `Record` wraps that
//! object with typed accessors for the handful of fields the engine reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::row::NormalizedPayload;
use super::value::format_number;

/// One stored entity: a JSON object with a string `id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record with the given identifier
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.into()));
        Self(fields)
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Non-empty text of a field; numbers are rendered as text
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => n.as_f64().map(format_number),
            _ => None,
        }
    }

    /// Numeric value of a field; numeric strings are accepted
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Calendar date of a field stored as `YYYY-MM-DD` (a time suffix is ignored)
    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        let text = self.get(field)?.as_str()?.trim();
        let day = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Whether a field holds text (case-insensitively) equal to one of `values`
    pub fn text_is_any(&self, field: &str, values: &[&str]) -> bool {
        self.text(field)
            .map(|t| values.iter().any(|v| t.eq_ignore_ascii_case(v)))
            .unwrap_or(false)
    }

    /// Overwrite fields with the values carried by a payload
    pub fn merge(&mut self, payload: &NormalizedPayload) {
        for (field, value) in payload.iter() {
            self.0.insert(field.to_string(), value.to_json());
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_accessors() {
        let r = record(json!({
            "id": "CURSO001",
            "title": "Inglés B1",
            "price": 300,
            "code": 1001,
            "startDate": "2024-01-15T00:00:00Z",
            "status": "enrolled",
            "teacherId": null
        }));

        assert_eq!(r.id(), "CURSO001");
        assert_eq!(r.text("title").as_deref(), Some("Inglés B1"));
        assert_eq!(r.text("code").as_deref(), Some("1001"));
        assert_eq!(r.number("price"), Some(300.0));
        assert_eq!(r.date("startDate"), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(r.text_is_any("status", &["ENROLLED", "IN_PROGRESS"]));
        assert!(!r.contains("teacherId"));
    }

    #[test]
    fn test_merge_overwrites_and_keeps_other_fields() {
        let mut r = record(json!({"id": "EST001", "name": "Ana", "phone": "600111222"}));
        let payload = NormalizedPayload::new().with("name", FieldValue::Text("Ana María".into()));

        r.merge(&payload);

        assert_eq!(r.text("name").as_deref(), Some("Ana María"));
        assert_eq!(r.text("phone").as_deref(), Some("600111222"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let r = Record::new("PROF001");
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"id":"PROF001"}"#);
    }
}

//! Rows before and after normalization

use super::value::{CellValue, FieldValue};

/// One data row of a sheet, keyed by the header labels as written
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line in the sheet, counting the header as line 1
    pub line: usize,
    pub cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { line, cells }
    }

    pub fn first_cell(&self) -> Option<&CellValue> {
        self.cells.first().map(|(_, value)| value)
    }

    /// Look up a cell by its exact header label
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, value)| value)
    }

    /// Whether every cell is blank
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.is_empty())
    }
}

/// A row mapped to canonical field names, ready for the entity store
///
/// Field order follows the sheet's column order; setting an existing field
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPayload {
    fields: Vec<(String, FieldValue)>,
}

impl NormalizedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Builder-style `set`
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// The stable identifier carried by the row, if any
    pub fn id(&self) -> Option<&str> {
        self.get("id")
            .and_then(FieldValue::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

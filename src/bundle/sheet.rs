//! In-memory form of a snapshot bundle

use crate::models::{CellValue, EntityKind, RawRow};

use super::manifest::Manifest;

/// One named table of a bundle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The entity this sheet holds, resolved from its name
    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::from_sheet_name(&self.name)
    }

    /// Data rows paired with their headers
    ///
    /// Line numbers count the header as line 1. Short rows are padded with
    /// empty cells; cells beyond the last header are dropped.
    pub fn raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let cells = self
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(col, header)| {
                        let value = row.get(col).cloned().unwrap_or(CellValue::Empty);
                        (header.clone(), value)
                    })
                    .collect();
                RawRow::new(idx + 2, cells)
            })
            .collect()
    }
}

/// A multi-sheet snapshot: optional manifest plus entity sheets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bundle {
    pub manifest: Option<Manifest>,
    pub sheets: Vec<Sheet>,
}

impl Bundle {
    pub fn new(manifest: Option<Manifest>, sheets: Vec<Sheet>) -> Self {
        Self { manifest, sheets }
    }

    /// The sheet holding records of `kind`, if the bundle has one
    ///
    /// When several sheets resolve to the same entity the first one wins.
    pub fn sheet_for(&self, kind: EntityKind) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.entity_kind() == Some(kind))
    }

    /// Names of sheets that match no entity
    pub fn unrecognized_sheets(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .filter(|s| s.entity_kind().is_none())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Total data rows across entity sheets
    pub fn total_rows(&self) -> usize {
        self.sheets
            .iter()
            .filter(|s| s.entity_kind().is_some())
            .map(Sheet::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_raw_rows_pad_short_rows() {
        let mut sheet = Sheet::new("Students", vec!["id".into(), "name".into(), "phone".into()]);
        sheet.push_row(vec![text("EST001"), text("Ana")]);

        let rows = sheet.raw_rows();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].get("phone"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_sheet_for_resolves_localized_names() {
        let bundle = Bundle::new(
            None,
            vec![
                Sheet::new("📖 Instrucciones", vec![]),
                Sheet::new("Cursos", vec!["id".into()]),
            ],
        );

        assert_eq!(bundle.sheet_for(EntityKind::Courses).map(|s| s.name.as_str()), Some("Cursos"));
        assert!(bundle.sheet_for(EntityKind::Students).is_none());
        assert_eq!(bundle.unrecognized_sheets(), vec!["📖 Instrucciones"]);
    }
}

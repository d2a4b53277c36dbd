//! The manifest sheet placed first in every written bundle
//!
//! Stored as a two-column `key,value` table: format tag, generation time,
//! application version, total and per-entity record counts, and free-form
//! notes (the template uses these for instructions).

use chrono::{DateTime, Utc};

use crate::models::{CellValue, EntityKind};

use super::sheet::Sheet;

/// Sheet name of the manifest inside a bundle
pub const MANIFEST_SHEET: &str = "manifest";

pub const SNAPSHOT_FORMAT: &str = "academy-snapshot-v1";
pub const TEMPLATE_FORMAT: &str = "academy-template-v1";

/// Bundle metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub format: String,
    pub generated_at: DateTime<Utc>,
    pub app_version: String,
    /// Record count of every entity, zeros included, in catalog order
    pub counts: Vec<(EntityKind, usize)>,
    pub notes: Vec<String>,
}

impl Manifest {
    /// Manifest for a snapshot generated now
    pub fn snapshot(counts: Vec<(EntityKind, usize)>) -> Self {
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            generated_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            counts,
            notes: Vec::new(),
        }
    }

    pub fn total_records(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn count_for(&self, kind: EntityKind) -> Option<usize> {
        self.counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
    }

    pub fn to_sheet(&self) -> Sheet {
        let mut sheet = Sheet::new(MANIFEST_SHEET, vec!["key".into(), "value".into()]);
        let mut push = |key: &str, value: String| {
            sheet.push_row(vec![CellValue::Text(key.to_string()), CellValue::Text(value)]);
        };

        push("format", self.format.clone());
        push("generatedAt", self.generated_at.to_rfc3339());
        push("appVersion", self.app_version.clone());
        push("totalRecords", self.total_records().to_string());
        for (kind, count) in &self.counts {
            push(kind.descriptor().key, count.to_string());
        }
        for note in &self.notes {
            push("note", note.clone());
        }
        sheet
    }

    /// Read a manifest sheet back; unknown keys are ignored
    pub fn from_sheet(sheet: &Sheet) -> Option<Self> {
        let mut manifest = Self {
            format: String::new(),
            generated_at: DateTime::<Utc>::MIN_UTC,
            app_version: String::new(),
            counts: Vec::new(),
            notes: Vec::new(),
        };

        for row in &sheet.rows {
            let key = row.first().map(CellValue::as_text).unwrap_or_default();
            let value = row.get(1).map(CellValue::as_text).unwrap_or_default();
            match key.as_str() {
                "format" => manifest.format = value,
                "generatedAt" => {
                    manifest.generated_at = DateTime::parse_from_rfc3339(&value)
                        .map(|dt| dt.with_timezone(&Utc))
                        .ok()?
                }
                "appVersion" => manifest.app_version = value,
                "note" => manifest.notes.push(value),
                other => {
                    let kind = EntityKind::ALL
                        .into_iter()
                        .find(|k| k.descriptor().key == other);
                    if let (Some(kind), Ok(count)) = (kind, value.parse::<usize>()) {
                        manifest.counts.push((kind, count));
                    }
                }
            }
        }

        if manifest.format.is_empty() {
            None
        } else {
            Some(manifest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_sheet_round_trip() {
        let mut manifest = Manifest::snapshot(vec![
            (EntityKind::Users, 0),
            (EntityKind::Students, 3),
            (EntityKind::Courses, 2),
        ]);
        manifest.notes.push("Campos con * son obligatorios".into());

        let sheet = manifest.to_sheet();
        assert_eq!(sheet.name, MANIFEST_SHEET);

        let parsed = Manifest::from_sheet(&sheet).unwrap();
        assert_eq!(parsed.format, SNAPSHOT_FORMAT);
        assert_eq!(parsed.total_records(), 5);
        assert_eq!(parsed.count_for(EntityKind::Users), Some(0));
        assert_eq!(parsed.count_for(EntityKind::Students), Some(3));
        assert_eq!(parsed.notes, vec!["Campos con * son obligatorios"]);
        assert_eq!(
            parsed.generated_at.timestamp(),
            manifest.generated_at.timestamp()
        );
    }

    #[test]
    fn test_sheet_without_format_is_not_a_manifest() {
        let sheet = Sheet::new(MANIFEST_SHEET, vec!["key".into(), "value".into()]);
        assert!(Manifest::from_sheet(&sheet).is_none());
    }
}

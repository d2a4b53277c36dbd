//! Snapshot exporter
//!
//! Reads every entity from the store and lays the records out as sheets.
//! Any read failure aborts the export; a partial snapshot is never produced.

use serde_json::Value;
use tracing::info;

use crate::bundle::{Bundle, Manifest, Sheet};
use crate::error::{AcademyError, AcademyResult};
use crate::models::{CellValue, EntityDescriptor, Record, CATALOG};
use crate::services::normalizer::{canonical_kind, FieldKind};
use crate::storage::EntityStore;

/// Service producing full snapshots of the store
pub struct SnapshotExporter<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> SnapshotExporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Dump every entity into a bundle
    ///
    /// Sheets follow catalog order and empty entities get no sheet, but the
    /// manifest lists a count for all of them.
    pub fn export(&self) -> AcademyResult<Bundle> {
        let mut counts = Vec::with_capacity(CATALOG.len());
        let mut sheets = Vec::new();

        for descriptor in &CATALOG {
            let records = self.store.list_all(descriptor.kind).map_err(|e| {
                AcademyError::Export(format!("Failed to read {}: {}", descriptor.label, e))
            })?;

            counts.push((descriptor.kind, records.len()));
            if !records.is_empty() {
                sheets.push(records_to_sheet(descriptor, &records));
            }
        }

        let manifest = Manifest::snapshot(counts);
        info!(
            sheets = sheets.len(),
            records = manifest.total_records(),
            "snapshot exported"
        );
        Ok(Bundle::new(Some(manifest), sheets))
    }
}

/// Lay records out as a sheet
///
/// Columns are the union of all record fields in first-seen order, with
/// `id` first. Timestamps in date columns are cut to their date; every
/// other value is written as stored.
pub fn records_to_sheet(descriptor: &EntityDescriptor, records: &[Record]) -> Sheet {
    let mut headers: Vec<String> = vec!["id".to_string()];
    for record in records {
        for (field, _) in record.fields() {
            if !headers.iter().any(|h| h == field) {
                headers.push(field.clone());
            }
        }
    }

    let date_columns: Vec<bool> = headers
        .iter()
        .map(|field| canonical_kind(field) == Some(FieldKind::Date))
        .collect();

    let mut sheet = Sheet::new(descriptor.sheet_id, headers);
    for record in records {
        let row = sheet
            .headers
            .iter()
            .zip(&date_columns)
            .map(|(field, &is_date)| {
                record
                    .get(field)
                    .map(|value| to_cell(value, is_date))
                    .unwrap_or(CellValue::Empty)
            })
            .collect();
        sheet.push_row(row);
    }
    sheet
}

/// Cell form of a stored value
fn to_cell(value: &Value, is_date: bool) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        Value::String(s) if is_date => CellValue::Text(date_part(s).unwrap_or(s).to_string()),
        Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// `2024-01-15` out of `2024-01-15T09:30:00Z`
fn date_part(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let looks_like_timestamp = bytes.len() > 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && matches!(bytes[10], b'T' | b' ')
        && bytes[..4].iter().all(u8::is_ascii_digit);
    if looks_like_timestamp {
        s.get(..10)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcademyPaths;
    use crate::models::{EntityKind, FieldValue, NormalizedPayload};
    use crate::storage::Storage;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = AcademyPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    struct FailingStore;

    impl EntityStore for FailingStore {
        fn list_all(&self, kind: EntityKind) -> AcademyResult<Vec<Record>> {
            if kind == EntityKind::Payments {
                Err(AcademyError::Storage("timeout".into()))
            } else {
                Ok(vec![Record::new("X1")])
            }
        }

        fn upsert(&self, _kind: EntityKind, _payload: &NormalizedPayload) -> AcademyResult<Record> {
            unreachable!("export never writes")
        }
    }

    #[test]
    fn test_empty_entities_have_no_sheet_but_are_counted() {
        let (_temp_dir, storage) = create_test_storage();
        let student = NormalizedPayload::new()
            .with("id", FieldValue::Text("EST001".into()))
            .with("name", FieldValue::Text("Ana".into()))
            .with("isAffiliated", FieldValue::Bool(true));
        storage.upsert(EntityKind::Students, &student).unwrap();

        let bundle = SnapshotExporter::new(&storage).export().unwrap();

        assert_eq!(bundle.sheets.len(), 1);
        assert_eq!(bundle.sheets[0].name, "Students");
        let manifest = bundle.manifest.unwrap();
        assert_eq!(manifest.counts.len(), 11);
        assert_eq!(manifest.count_for(EntityKind::Students), Some(1));
        assert_eq!(manifest.count_for(EntityKind::Courses), Some(0));
    }

    #[test]
    fn test_read_failure_aborts_export() {
        let err = SnapshotExporter::new(&FailingStore).export().unwrap_err();
        assert!(matches!(err, AcademyError::Export(_)));
        assert!(err.to_string().contains("Payments"));
    }

    #[test]
    fn test_records_to_sheet_layout() {
        let a: Record = serde_json::from_value(serde_json::json!({
            "name": "Ana", "id": "EST001", "isAffiliated": false,
            "createdAt": "2024-01-15T09:30:00.000Z"
        }))
        .unwrap();
        let b: Record = serde_json::from_value(serde_json::json!({
            "id": "EST002", "name": "Luis", "phone": "600111222"
        }))
        .unwrap();

        let sheet = records_to_sheet(EntityKind::Students.descriptor(), &[a, b]);

        assert_eq!(sheet.headers, vec!["id", "name", "isAffiliated", "createdAt", "phone"]);
        assert_eq!(sheet.rows[0][2], CellValue::Bool(false));
        assert_eq!(sheet.rows[0][3], CellValue::Text("2024-01-15".into()));
        assert_eq!(sheet.rows[1][2], CellValue::Empty);
        assert_eq!(sheet.rows[1][4], CellValue::Text("600111222".into()));
    }

    #[test]
    fn test_free_text_that_starts_with_a_date_is_kept_whole() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": "EST001",
            "notes": "2024-01-15 llamar a la madre",
            "paymentDate": "2024-01-15 10:00",
            "Comentario": "2024-02-01T entrega"
        }))
        .unwrap();

        let sheet = records_to_sheet(EntityKind::Students.descriptor(), &[record]);

        assert_eq!(sheet.headers, vec!["id", "notes", "paymentDate", "Comentario"]);
        assert_eq!(sheet.rows[0][1], CellValue::Text("2024-01-15 llamar a la madre".into()));
        assert_eq!(sheet.rows[0][2], CellValue::Text("2024-01-15".into()));
        assert_eq!(sheet.rows[0][3], CellValue::Text("2024-02-01T entrega".into()));
    }

    #[test]
    fn test_repeated_export_gives_same_counts() {
        let (_temp_dir, storage) = create_test_storage();
        for (id, name) in [("PROF001", "Marta"), ("PROF002", "Jorge")] {
            storage
                .upsert(
                    EntityKind::Teachers,
                    &NormalizedPayload::new()
                        .with("id", FieldValue::Text(id.into()))
                        .with("name", FieldValue::Text(name.into())),
                )
                .unwrap();
        }
        storage
            .upsert(
                EntityKind::Providers,
                &NormalizedPayload::new()
                    .with("id", FieldValue::Text("PROV001".into()))
                    .with("name", FieldValue::Text("Librería Central".into())),
            )
            .unwrap();

        let exporter = SnapshotExporter::new(&storage);
        let first = exporter.export().unwrap();
        let second = exporter.export().unwrap();

        let first_manifest = first.manifest.unwrap();
        let second_manifest = second.manifest.unwrap();
        assert_eq!(first_manifest.counts, second_manifest.counts);
        assert_eq!(first_manifest.count_for(EntityKind::Teachers), Some(2));
        assert_eq!(first.sheets, second.sheets);
    }
}

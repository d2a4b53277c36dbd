//! Storage layer for the academy toolkit
//!
//! `EntityStore` is the boundary the import and export engines talk to.
//! `Storage` implements it on top of one JSON file per entity table, with
//! atomic writes, required-field validation and foreign-key checks.

pub mod file_io;
pub mod table;

pub use file_io::{read_json, write_json_atomic};
pub use table::{EntityTable, UpsertKind};

use tracing::debug;

use crate::config::paths::AcademyPaths;
use crate::error::{AcademyError, AcademyResult};
use crate::models::{EntityKind, FieldValue, NormalizedPayload, Record};

/// Create/update and read access to entity records
///
/// Implementations must tolerate concurrent `upsert` calls for the same
/// entity kind.
pub trait EntityStore: Sync {
    /// Every stored record of one entity type
    fn list_all(&self, kind: EntityKind) -> AcademyResult<Vec<Record>>;

    /// Update the record whose id the payload carries, or create a new one
    fn upsert(&self, kind: EntityKind, payload: &NormalizedPayload) -> AcademyResult<Record>;

    /// Persist pending writes
    fn flush(&self) -> AcademyResult<()> {
        Ok(())
    }
}

/// Main storage coordinator holding one table per entity type
pub struct Storage {
    paths: AcademyPaths,
    tables: Vec<EntityTable>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: AcademyPaths) -> AcademyResult<Self> {
        paths.ensure_directories()?;

        let tables = EntityKind::ALL
            .iter()
            .map(|&kind| EntityTable::new(kind, paths.entity_file(kind)))
            .collect();

        Ok(Self { paths, tables })
    }

    /// Open the store and load every table from disk
    pub fn open(paths: AcademyPaths) -> AcademyResult<Self> {
        let storage = Self::new(paths)?;
        storage.load_all()?;
        Ok(storage)
    }

    pub fn paths(&self) -> &AcademyPaths {
        &self.paths
    }

    /// Table for one entity type
    pub fn table(&self, kind: EntityKind) -> &EntityTable {
        // Tables are built from EntityKind::ALL, which follows declaration order
        &self.tables[kind as usize]
    }

    pub fn load_all(&self) -> AcademyResult<()> {
        for table in &self.tables {
            table.load()?;
        }
        Ok(())
    }

    pub fn save_all(&self) -> AcademyResult<()> {
        for table in &self.tables {
            table.save()?;
        }
        Ok(())
    }

    /// Reject payloads whose relation fields point at missing records
    fn check_references(&self, kind: EntityKind, payload: &NormalizedPayload) -> AcademyResult<()> {
        for reference in kind.descriptor().references {
            let Some(value) = payload.get(reference.field) else {
                continue;
            };
            let target_id = match value {
                FieldValue::Reference(id) | FieldValue::Text(id) => id.as_str(),
                other => {
                    return Err(AcademyError::Validation(format!(
                        "Field '{}' must be an identifier, got '{}'",
                        reference.field, other
                    )))
                }
            };
            if !self.table(reference.target).contains(target_id)? {
                return Err(AcademyError::reference(
                    reference.field,
                    reference.target.label(),
                    target_id,
                ));
            }
        }
        Ok(())
    }
}

impl EntityStore for Storage {
    fn list_all(&self, kind: EntityKind) -> AcademyResult<Vec<Record>> {
        self.table(kind).get_all()
    }

    fn upsert(&self, kind: EntityKind, payload: &NormalizedPayload) -> AcademyResult<Record> {
        self.check_references(kind, payload)?;

        let (record, outcome) = self
            .table(kind)
            .upsert(payload, kind.descriptor().required_fields)?;
        debug!(entity = %kind, id = record.id(), ?outcome, "record stored");
        Ok(record)
    }

    fn flush(&self) -> AcademyResult<()> {
        self.save_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = AcademyPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_test_storage();

        assert!(temp_dir.path().join("data").exists());
        assert!(temp_dir.path().join("backups").exists());
        for kind in EntityKind::ALL {
            assert_eq!(storage.table(kind).kind(), kind);
        }
    }

    #[test]
    fn test_reference_to_missing_record_is_rejected() {
        let (_temp_dir, storage) = create_test_storage();
        let course = NormalizedPayload::new()
            .with("id", text("CURSO001"))
            .with("title", text("Inglés B1"))
            .with("teacherId", FieldValue::Reference("PROF404".into()));

        let err = storage.upsert(EntityKind::Courses, &course).unwrap_err();

        assert!(matches!(err, AcademyError::Reference { .. }));
        assert!(err.is_row_level());
        assert!(storage.list_all(EntityKind::Courses).unwrap().is_empty());
    }

    #[test]
    fn test_reference_to_existing_record_is_accepted() {
        let (_temp_dir, storage) = create_test_storage();
        let teacher = NormalizedPayload::new()
            .with("id", text("PROF001"))
            .with("name", text("Laura"));
        storage.upsert(EntityKind::Teachers, &teacher).unwrap();

        let course = NormalizedPayload::new()
            .with("id", text("CURSO001"))
            .with("title", text("Inglés B1"))
            .with("teacherId", FieldValue::Reference("PROF001".into()));
        let record = storage.upsert(EntityKind::Courses, &course).unwrap();

        assert_eq!(record.text("teacherId").as_deref(), Some("PROF001"));
    }

    #[test]
    fn test_flush_persists_tables() {
        let (temp_dir, storage) = create_test_storage();
        let student = NormalizedPayload::new()
            .with("id", text("EST001"))
            .with("name", text("Ana"));
        storage.upsert(EntityKind::Students, &student).unwrap();
        storage.flush().unwrap();

        let reopened =
            Storage::open(AcademyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        let students = reopened.list_all(EntityKind::Students).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id(), "EST001");
    }
}

//! One entity table backed by a JSON file
//!
//! Records are kept in insertion order, with an id index for upserts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AcademyError, AcademyResult};
use crate::models::{EntityKind, NormalizedPayload, Record};

use super::file_io::{read_json, write_json_atomic};

/// Serializable table file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableFile {
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct TableData {
    records: Vec<Record>,
    by_id: HashMap<String, usize>,
}

impl TableData {
    fn rebuild_index(&mut self) {
        self.by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.id().to_string(), idx))
            .collect();
    }
}

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

/// Repository for the records of one entity type
pub struct EntityTable {
    kind: EntityKind,
    path: PathBuf,
    data: RwLock<TableData>,
    dirty: AtomicBool,
}

impl EntityTable {
    pub fn new(kind: EntityKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            data: RwLock::new(TableData::default()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn read(&self) -> AcademyResult<RwLockReadGuard<'_, TableData>> {
        self.data
            .read()
            .map_err(|e| AcademyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> AcademyResult<RwLockWriteGuard<'_, TableData>> {
        self.data
            .write()
            .map_err(|e| AcademyError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load records from disk
    pub fn load(&self) -> AcademyResult<()> {
        let file: TableFile = read_json(&self.path)?;

        let mut data = self.write()?;
        data.records = file.records;
        data.rebuild_index();
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Save records to disk if anything changed since the last save
    pub fn save(&self) -> AcademyResult<()> {
        if !self.dirty.load(Ordering::SeqCst) {
            return Ok(());
        }

        let data = self.read()?;
        let file = TableFile {
            records: data.records.clone(),
        };
        write_json_atomic(&self.path, &file)?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn get(&self, id: &str) -> AcademyResult<Option<Record>> {
        let data = self.read()?;
        Ok(data.by_id.get(id).map(|&idx| data.records[idx].clone()))
    }

    pub fn contains(&self, id: &str) -> AcademyResult<bool> {
        Ok(self.read()?.by_id.contains_key(id))
    }

    /// All records in insertion order
    pub fn get_all(&self) -> AcademyResult<Vec<Record>> {
        Ok(self.read()?.records.clone())
    }

    pub fn count(&self) -> AcademyResult<usize> {
        Ok(self.read()?.records.len())
    }

    /// Update the record whose id the payload carries, or create a new one
    ///
    /// New records keep the supplied id or get a fresh UUID, and receive a
    /// `createdAt` date when the payload has none. The merged record must
    /// hold every field in `required`.
    pub fn upsert(
        &self,
        payload: &NormalizedPayload,
        required: &[&str],
    ) -> AcademyResult<(Record, UpsertKind)> {
        let mut data = self.write()?;

        let existing = payload.id().and_then(|id| data.by_id.get(id).copied());
        let (record, kind) = match existing {
            Some(idx) => {
                let mut record = data.records[idx].clone();
                record.merge(payload);
                (record, UpsertKind::Updated)
            }
            None => {
                let id = payload
                    .id()
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let mut record = Record::new(id);
                record.merge(payload);
                if !record.contains("createdAt") {
                    record.set(
                        "createdAt",
                        Local::now().date_naive().format("%Y-%m-%d").to_string().into(),
                    );
                }
                (record, UpsertKind::Created)
            }
        };

        if let Some(missing) = required.iter().find(|field| !record.contains(field)) {
            return Err(AcademyError::Validation(format!(
                "Missing required field '{}'",
                missing
            )));
        }

        match existing {
            Some(idx) => data.records[idx] = record.clone(),
            None => {
                let idx = data.records.len();
                data.by_id.insert(record.id().to_string(), idx);
                data.records.push(record.clone());
            }
        }
        self.dirty.store(true, Ordering::SeqCst);

        Ok((record, kind))
    }
}

//! Snapshot archive
//!
//! Keeps timestamped snapshot bundles in the backups directory with a
//! count-based retention policy. The newest snapshot is what `import` falls
//! back to when no file is given.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::bundle::{write_bundle, Bundle};
use crate::config::{AcademyPaths, SnapshotRetention};
use crate::error::{AcademyError, AcademyResult};

const SNAPSHOT_PREFIX: &str = "backup-";
const SNAPSHOT_EXTENSION: &str = "zip";

/// Metadata about a stored snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Parsed from the filename, not the file's mtime
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Manages snapshot creation, lookup and retention
pub struct SnapshotArchive {
    backup_dir: PathBuf,
    retention: SnapshotRetention,
}

impl SnapshotArchive {
    pub fn new(paths: &AcademyPaths, retention: SnapshotRetention) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            retention,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshots retention keeps; never less than one
    pub fn keep_count(&self) -> usize {
        (self.retention.keep_count as usize).max(1)
    }

    /// Write a bundle as a new snapshot and return its path
    pub fn create(&self, bundle: &Bundle) -> AcademyResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            AcademyError::Io(format!("Failed to create backup directory: {}", e))
        })?;

        let now = Utc::now();
        let filename = format!(
            "{}{}-{:03}.{}",
            SNAPSHOT_PREFIX,
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis(),
            SNAPSHOT_EXTENSION
        );
        let path = self.backup_dir.join(&filename);
        write_bundle(bundle, &path)?;

        info!(snapshot = %filename, records = bundle.total_rows(), "snapshot created");
        Ok(path)
    }

    /// All snapshots, newest first
    pub fn list(&self) -> AcademyResult<Vec<SnapshotInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            AcademyError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry
                .map_err(|e| AcademyError::Io(format!("Failed to read directory entry: {}", e)))?;
            if let Some(info) = parse_snapshot_info(&entry.path()) {
                snapshots.push(info);
            }
        }

        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }

    pub fn latest(&self) -> AcademyResult<Option<SnapshotInfo>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Delete all but the newest `keep_count` snapshots
    ///
    /// The newest snapshot is always kept, even with a `keep_count` of 0.
    pub fn enforce_retention(&self) -> AcademyResult<Vec<PathBuf>> {
        let keep = self.keep_count();
        let mut deleted = Vec::new();

        for snapshot in self.list()?.into_iter().skip(keep) {
            fs::remove_file(&snapshot.path).map_err(|e| {
                AcademyError::Io(format!("Failed to delete old snapshot: {}", e))
            })?;
            debug!(snapshot = %snapshot.filename, "snapshot pruned");
            deleted.push(snapshot.path);
        }

        Ok(deleted)
    }

    /// Create a snapshot and then enforce the retention policy
    pub fn create_with_retention(&self, bundle: &Bundle) -> AcademyResult<(PathBuf, Vec<PathBuf>)> {
        let path = self.create(bundle)?;
        let deleted = self.enforce_retention()?;
        Ok((path, deleted))
    }
}

fn parse_snapshot_info(path: &Path) -> Option<SnapshotInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();
    let stamp = filename
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(&format!(".{}", SNAPSHOT_EXTENSION))?;
    let created_at = parse_snapshot_timestamp(stamp)?;
    let size_bytes = fs::metadata(path).ok()?.len();

    Some(SnapshotInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

/// `YYYYMMDD-HHMMSS` with an optional `-mmm` millisecond suffix
fn parse_snapshot_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (seconds, millis) = match stamp.len() {
        15 => (stamp, 0),
        19 => (stamp.get(..15)?, stamp.get(16..)?.parse::<u32>().ok()?),
        _ => return None,
    };
    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d-%H%M%S").ok()?;
    let naive = naive.checked_add_signed(chrono::Duration::milliseconds(i64::from(millis)))?;
    Some(naive.and_utc())
}

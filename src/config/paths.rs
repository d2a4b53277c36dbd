//! Path management for the academy toolkit
//!
//! ## Path Resolution Order
//!
//! 1. `ACADEMY_CLI_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory reported by `directories`
//!    (`~/.config/academy-cli` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::AcademyError;
use crate::models::EntityKind;

/// Manages all paths used by the toolkit
#[derive(Debug, Clone)]
pub struct AcademyPaths {
    /// Base directory for all data
    base_dir: PathBuf,
}

impl AcademyPaths {
    /// Create a new AcademyPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform configuration directory can be found.
    pub fn new() -> Result<Self, AcademyError> {
        let base_dir = if let Ok(custom) = std::env::var("ACADEMY_CLI_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create AcademyPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding one JSON file per entity
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory where snapshots are archived
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the JSON file backing one entity table
    pub fn entity_file(&self, kind: EntityKind) -> PathBuf {
        self.data_dir()
            .join(format!("{}.json", kind.descriptor().key))
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), AcademyError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AcademyError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| AcademyError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| AcademyError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if the toolkit has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, AcademyError> {
    ProjectDirs::from("", "", "academy-cli")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| AcademyError::Config("Could not determine a configuration directory".into()))
}

//! User settings for the academy toolkit
//!
//! Holds the import conventions (markers, worker count), the billing cadence
//! constants and the snapshot retention policy.

use serde::{Deserialize, Serialize};

use super::paths::AcademyPaths;
use crate::error::AcademyError;
use crate::models::PriceUnit;

/// Cadence constants used by billing reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Length of one SESSION billing period in days
    #[serde(default = "default_session_days")]
    pub session_days: u32,

    /// Calendar months in one MONTH period
    #[serde(default = "default_month_months")]
    pub month_months: u32,

    /// Calendar months in one TRIMESTER period
    #[serde(default = "default_trimester_months")]
    pub trimester_months: u32,

    /// Calendar months in one YEAR period
    #[serde(default = "default_year_months")]
    pub year_months: u32,

    /// Unit assumed when a course has no price unit
    #[serde(default = "default_price_unit")]
    pub default_price_unit: PriceUnit,
}

fn default_session_days() -> u32 {
    7
}

fn default_month_months() -> u32 {
    1
}

fn default_trimester_months() -> u32 {
    3
}

fn default_year_months() -> u32 {
    12
}

fn default_price_unit() -> PriceUnit {
    PriceUnit::Month
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            month_months: default_month_months(),
            trimester_months: default_trimester_months(),
            year_months: default_year_months(),
            default_price_unit: default_price_unit(),
        }
    }
}

/// Snapshot retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRetention {
    /// Number of archived snapshots to keep
    pub keep_count: u32,
}

impl Default for SnapshotRetention {
    fn default() -> Self {
        Self { keep_count: 30 }
    }
}

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency symbol used when printing amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Character marking a required column in a sheet header
    #[serde(default = "default_required_marker")]
    pub required_marker: char,

    /// Strings that flag a template example row (matched case-insensitively)
    #[serde(default = "default_example_markers")]
    pub example_markers: Vec<String>,

    /// Worker threads used for the rows of a single entity (1 = sequential)
    #[serde(default = "default_import_workers")]
    pub import_workers: usize,

    /// Billing cadence constants
    #[serde(default)]
    pub billing: BillingSettings,

    /// Snapshot retention policy
    #[serde(default)]
    pub retention: SnapshotRetention,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "€".to_string()
}

fn default_required_marker() -> char {
    '*'
}

fn default_example_markers() -> Vec<String> {
    vec!["ejemplo".to_string(), "example".to_string()]
}

fn default_import_workers() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            required_marker: default_required_marker(),
            example_markers: default_example_markers(),
            import_workers: default_import_workers(),
            billing: BillingSettings::default(),
            retention: SnapshotRetention::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &AcademyPaths) -> Result<Self, AcademyError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| AcademyError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                AcademyError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AcademyPaths) -> Result<(), AcademyError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AcademyError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(&settings_path, contents)
            .map_err(|e| AcademyError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Whether a cell carries one of the example markers
    pub fn is_example_marker(&self, cell: &str) -> bool {
        let lower = cell.to_lowercase();
        self.example_markers
            .iter()
            .any(|marker| !marker.is_empty() && lower.contains(&marker.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.required_marker, '*');
        assert_eq!(settings.import_workers, 1);
        assert_eq!(settings.billing.session_days, 7);
        assert_eq!(settings.billing.trimester_months, 3);
        assert_eq!(settings.billing.default_price_unit, PriceUnit::Month);
        assert_eq!(settings.retention.keep_count, 30);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AcademyPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.import_workers = 4;
        settings.billing.session_days = 14;

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.import_workers, 4);
        assert_eq!(loaded.billing.session_days, 14);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AcademyPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), r#"{"currency_symbol": "$"}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.currency_symbol, "$");
        assert_eq!(loaded.example_markers, vec!["ejemplo", "example"]);
        assert_eq!(loaded.billing.year_months, 12);
    }

    #[test]
    fn test_example_marker_is_case_insensitive() {
        let settings = Settings::default();
        assert!(settings.is_example_marker("EJEMPLO_EST001"));
        assert!(settings.is_example_marker("Example row"));
        assert!(!settings.is_example_marker("EST001"));
    }
}

//! Configuration module for the academy toolkit
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - Settings persistence (import conventions, billing cadence, retention)

pub mod paths;
pub mod settings;

pub use paths::AcademyPaths;
pub use settings::{BillingSettings, Settings, SnapshotRetention};

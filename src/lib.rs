//! academy-cli - bulk data interchange and billing reconciliation for an
//! educational center
//!
//! The library moves the center's records (users, teachers, students,
//! courses, enrollments, payments and the rest) between a local JSON store
//! and snapshot bundles, and reconciles what each active enrollment owes
//! against what has been paid.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Entity catalog, records, money and billing types
//! - `storage`: JSON file entity store
//! - `bundle`: Snapshot bundle container (zip of CSV sheets)
//! - `services`: Normalization, import, export, billing, snapshots
//! - `cli`: Command handlers
//! - `display`: Terminal tables
//!
//! # Example
//!
//! ```rust,ignore
//! use academy_cli::config::{AcademyPaths, Settings};
//! use academy_cli::services::SnapshotExporter;
//! use academy_cli::storage::Storage;
//!
//! let paths = AcademyPaths::new()?;
//! let storage = Storage::open(paths)?;
//! let bundle = SnapshotExporter::new(&storage).export()?;
//! ```

pub mod bundle;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{AcademyError, AcademyResult};

//! Snapshot bundle container
//!
//! A bundle is a set of named tabular sheets, one per entity type, preceded
//! by a manifest sheet. On disk it is a zip archive of CSV files.

pub mod container;
pub mod manifest;
pub mod sheet;

pub use container::{read_bundle, read_zip, write_bundle, write_bundle_dir, write_zip};
pub use manifest::{Manifest, MANIFEST_SHEET, SNAPSHOT_FORMAT, TEMPLATE_FORMAT};
pub use sheet::{Bundle, Sheet};

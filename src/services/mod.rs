//! Service layer for academy-cli
//!
//! Business operations on top of the entity store: column normalization,
//! bulk import and export, billing reconciliation, snapshot archiving and
//! template generation.

pub mod billing;
pub mod exporter;
pub mod importer;
pub mod normalizer;
pub mod orchestrator;
pub mod snapshots;
pub mod template;

pub use billing::BillingService;
pub use exporter::SnapshotExporter;
pub use importer::{import_row, RowOutcome};
pub use normalizer::{Normalizer, RowError};
pub use orchestrator::{CancellationToken, ImportEvent, ImportOrchestrator, ImportResult, RowFailure};
pub use snapshots::{SnapshotArchive, SnapshotInfo};
pub use template::build_template;

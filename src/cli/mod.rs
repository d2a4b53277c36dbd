//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod snapshots;
pub mod tracking;
pub mod transfer;

pub use snapshots::{handle_snapshot_command, SnapshotCommands};
pub use tracking::{handle_tracking_command, TrackingArgs, TrackingFormat};
pub use transfer::{
    handle_export_command, handle_import_command, handle_template_command, ExportArgs, ImportArgs,
    TemplateArgs,
};

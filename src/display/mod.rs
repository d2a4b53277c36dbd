//! Display formatting for terminal output
//!
//! Renders import tallies and billing tracking as text tables.

pub mod import;
pub mod tracking;

pub use import::{format_import_event, format_import_results};
pub use tracking::format_tracking_table;

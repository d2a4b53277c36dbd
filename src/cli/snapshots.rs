//! Snapshot CLI commands
//!
//! Lists, creates and prunes the snapshots kept in the backups directory.

use clap::Subcommand;

use crate::config::{AcademyPaths, Settings};
use crate::error::AcademyResult;
use crate::services::{SnapshotArchive, SnapshotExporter};
use crate::storage::Storage;

/// Snapshot subcommands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// List stored snapshots, newest first
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Export the store into a new snapshot
    Create,

    /// Delete snapshots beyond the retention count
    Prune {
        /// Skip the dry run and delete
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a snapshot command
pub fn handle_snapshot_command(
    storage: &Storage,
    paths: &AcademyPaths,
    settings: &Settings,
    cmd: SnapshotCommands,
) -> AcademyResult<()> {
    let archive = SnapshotArchive::new(paths, settings.retention.clone());

    match cmd {
        SnapshotCommands::List { verbose } => {
            let snapshots = archive.list()?;

            if snapshots.is_empty() {
                println!("No snapshots found.");
                println!("Create one with: academy snapshots create");
                return Ok(());
            }

            println!("Available Snapshots");
            println!("===================");
            println!();

            for (i, snapshot) in snapshots.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(snapshot.created_at);
                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Path: {}\n",
                        i + 1,
                        snapshot.filename,
                        snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(snapshot.size_bytes),
                        snapshot.path.display(),
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        snapshot.filename,
                        format_duration(age),
                        format_size(snapshot.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} snapshot(s)", snapshots.len());
        }

        SnapshotCommands::Create => {
            let bundle = SnapshotExporter::new(storage).export()?;
            let (path, pruned) = archive.create_with_retention(&bundle)?;
            println!("Snapshot created: {}", path.display());
            if !pruned.is_empty() {
                println!("Pruned {} old snapshot(s).", pruned.len());
            }
        }

        SnapshotCommands::Prune { force } => {
            let keep = archive.keep_count();
            let existing = archive.list()?.len();
            let to_delete = existing.saturating_sub(keep);

            if to_delete == 0 {
                println!("No snapshots to prune.");
                println!("Retention keeps {}; you have {}.", keep, existing);
                return Ok(());
            }

            println!("Retention keeps {}; {} of {} would be deleted.", keep, to_delete, existing);
            if !force {
                println!("To delete them, run again with --force:");
                println!("  academy snapshots prune --force");
                return Ok(());
            }

            let deleted = archive.enforce_retention()?;
            println!("Deleted {} snapshot(s).", deleted.len());
        }
    }

    Ok(())
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes < 1 {
        return format!("{}s", duration.num_seconds().max(0));
    }
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        format!("{}d", days)
    } else {
        format!("{}mo", days / 30)
    }
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

//! Bundle transfer CLI commands
//!
//! `export`, `import` and `template`: moving whole snapshots in and out of
//! the store.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::Args;

use crate::bundle::{read_bundle, write_bundle, write_bundle_dir, Bundle};
use crate::config::{AcademyPaths, Settings};
use crate::display::{format_import_event, format_import_results};
use crate::error::{AcademyError, AcademyResult};
use crate::services::{
    build_template, ImportOrchestrator, ImportResult, SnapshotArchive, SnapshotExporter,
};
use crate::storage::{EntityStore, Storage};

/// Arguments of `export`
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file; defaults to a new snapshot in the backups directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a directory of CSV files instead of a zip archive
    #[arg(long, requires = "output")]
    pub dir: bool,
}

/// Arguments of `import`
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Bundle to import (zip archive or directory of CSV files); defaults
    /// to the latest snapshot
    pub file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress per-entity progress lines
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments of `template`
#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Output file
    #[arg(short, long, default_value = "academy-template.zip")]
    pub output: PathBuf,
}

/// Handle `export`
pub fn handle_export_command(
    storage: &Storage,
    paths: &AcademyPaths,
    settings: &Settings,
    args: ExportArgs,
) -> AcademyResult<()> {
    let bundle = SnapshotExporter::new(storage).export()?;
    let total = bundle.manifest.as_ref().map_or(0, |m| m.total_records());

    let location = match args.output {
        Some(path) if args.dir => {
            write_bundle_dir(&bundle, &path)?;
            path
        }
        Some(path) => {
            write_bundle(&bundle, &path)?;
            path
        }
        None => {
            let archive = SnapshotArchive::new(paths, settings.retention.clone());
            let (path, pruned) = archive.create_with_retention(&bundle)?;
            if !pruned.is_empty() {
                println!("Pruned {} old snapshot(s).", pruned.len());
            }
            path
        }
    };

    println!(
        "Exported {} record(s) in {} sheet(s) to {}",
        total,
        bundle.sheets.len(),
        location.display()
    );
    Ok(())
}

/// Handle `import`
pub fn handle_import_command(
    storage: &Storage,
    paths: &AcademyPaths,
    settings: &Settings,
    args: ImportArgs,
) -> AcademyResult<()> {
    let path = match args.file {
        Some(path) => path,
        None => latest_snapshot(paths, settings)?,
    };
    let bundle = read_bundle(&path)?;
    for name in bundle.unrecognized_sheets() {
        eprintln!("Skipping unrecognized sheet '{}'", name);
    }

    let results = run_import(storage, settings, &bundle, args.quiet || args.json)?;
    storage.flush()?;

    if args.json {
        let json = serde_json::to_string_pretty(&results)?;
        println!("{}", json);
    } else {
        println!("Imported from {}", path.display());
        println!();
        print!("{}", format_import_results(&results));
    }
    Ok(())
}

/// Handle `template`
pub fn handle_template_command(settings: &Settings, args: TemplateArgs) -> AcademyResult<()> {
    let bundle = build_template(settings);
    write_bundle(&bundle, &args.output)?;
    println!(
        "Template with {} sheet(s) written to {}",
        bundle.sheets.len(),
        args.output.display()
    );
    println!(
        "Columns marked with '{}' are required; the first row of each sheet is an example.",
        settings.required_marker
    );
    Ok(())
}

/// Run the orchestrator on a worker thread, printing progress as it arrives
fn run_import(
    storage: &Storage,
    settings: &Settings,
    bundle: &Bundle,
    quiet: bool,
) -> AcademyResult<Vec<ImportResult>> {
    let (tx, rx) = mpsc::channel();
    let orchestrator = ImportOrchestrator::new(storage, settings).with_events(tx);

    thread::scope(|scope| {
        let worker = scope.spawn(move || orchestrator.run(bundle));
        for event in rx {
            if quiet {
                continue;
            }
            if let Some(line) = format_import_event(&event) {
                eprintln!("{}", line);
            }
        }
        worker
            .join()
            .map_err(|_| AcademyError::Import("Import worker panicked".into()))?
    })
}

fn latest_snapshot(paths: &AcademyPaths, settings: &Settings) -> AcademyResult<PathBuf> {
    SnapshotArchive::new(paths, settings.retention.clone())
        .latest()?
        .map(|s| s.path)
        .ok_or_else(|| AcademyError::not_found("Snapshot", "latest"))
}


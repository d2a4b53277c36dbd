use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use academy_cli::cli::{
    handle_export_command, handle_import_command, handle_snapshot_command,
    handle_template_command, handle_tracking_command, ExportArgs, ImportArgs, SnapshotCommands,
    TemplateArgs, TrackingArgs,
};
use academy_cli::config::{AcademyPaths, Settings};
use academy_cli::models::in_dependency_order;
use academy_cli::storage::Storage;

#[derive(Parser)]
#[command(
    name = "academy",
    version,
    about = "Bulk snapshot export/import and billing reconciliation for an educational center",
    long_about = "academy moves an educational center's records between a local store and \
                  snapshot bundles (zip archives of CSV sheets), and reconciles what each \
                  active enrollment owes against the payments recorded."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every entity into a snapshot bundle
    Export(ExportArgs),

    /// Import a bundle into the store
    Import(ImportArgs),

    /// Show what each active enrollment owes
    #[command(alias = "billing")]
    Tracking(TrackingArgs),

    /// Write an empty import template
    Template(TemplateArgs),

    /// Snapshot management commands
    #[command(subcommand)]
    Snapshots(SnapshotCommands),

    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ACADEMY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let paths = AcademyPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let storage = Storage::open(paths.clone())?;

    match cli.command {
        Some(Commands::Export(args)) => handle_export_command(&storage, &paths, &settings, args)?,
        Some(Commands::Import(args)) => handle_import_command(&storage, &paths, &settings, args)?,
        Some(Commands::Tracking(args)) => handle_tracking_command(&storage, &settings, args)?,
        Some(Commands::Template(args)) => handle_template_command(&settings, args)?,
        Some(Commands::Snapshots(cmd)) => handle_snapshot_command(&storage, &paths, &settings, cmd)?,
        Some(Commands::Init) => {
            println!("Initializing academy-cli at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            storage.save_all()?;
            println!("Initialization complete!");
            println!();
            println!("Run 'academy template' to get a bundle you can fill in,");
            println!("then 'academy import <file>' to load it.");
        }
        Some(Commands::Config) => {
            println!("academy-cli Configuration");
            println!("=========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Initialized:      {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Currency symbol:    {}", settings.currency_symbol);
            println!("  Required marker:    {}", settings.required_marker);
            println!("  Example markers:    {}", settings.example_markers.join(", "));
            println!("  Import workers:     {}", settings.import_workers);
            println!("  Default price unit: {}", settings.billing.default_price_unit);
            println!("  Session length:     {} day(s)", settings.billing.session_days);
            println!("  Snapshots kept:     {}", settings.retention.keep_count);
            println!();
            println!("Entities (import order):");
            for descriptor in in_dependency_order() {
                println!("  [{}] {}", descriptor.dependency_rank, descriptor.label);
            }
        }
        None => {
            println!("academy - educational center data interchange and billing");
            println!();
            println!("Run 'academy --help' for usage information.");
        }
    }

    Ok(())
}

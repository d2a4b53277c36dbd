//! Billing tracking CLI command

use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};

use crate::config::Settings;
use crate::display::format_tracking_table;
use crate::error::{AcademyError, AcademyResult};
use crate::models::PaymentStatus;
use crate::services::BillingService;
use crate::storage::Storage;

/// Output format of `tracking`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrackingFormat {
    Table,
    Json,
    Yaml,
}

/// Arguments of `tracking`
#[derive(Args, Debug)]
pub struct TrackingArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: TrackingFormat,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub date: Option<String>,

    /// Only show enrollments with something outstanding
    #[arg(long)]
    pub pending: bool,
}

/// Handle `tracking`
pub fn handle_tracking_command(
    storage: &Storage,
    settings: &Settings,
    args: TrackingArgs,
) -> AcademyResult<()> {
    let today = match args.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AcademyError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        })?,
        None => Local::now().date_naive(),
    };

    let mut tracking = BillingService::new(storage, &settings.billing).track_payments(today)?;
    if args.pending {
        tracking.retain(|t| t.status != PaymentStatus::Paid);
    }

    match args.format {
        TrackingFormat::Table => print!("{}", format_tracking_table(&tracking, &settings.currency_symbol)),
        TrackingFormat::Json => println!("{}", serde_json::to_string_pretty(&tracking)?),
        TrackingFormat::Yaml => {
            let yaml = serde_yaml::to_string(&tracking)
                .map_err(|e| AcademyError::Billing(format!("Failed to serialize tracking: {}", e)))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

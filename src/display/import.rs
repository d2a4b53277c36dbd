//! Import result formatting
//!
//! Renders the per-entity tallies of an import run as a table, followed by
//! the individual row failures.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::services::{ImportEvent, ImportResult};

#[derive(Tabled)]
struct ImportRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Imported")]
    success: usize,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Total")]
    total: usize,
}

/// Format the results of an import run
pub fn format_import_results(results: &[ImportResult]) -> String {
    if results.is_empty() {
        return "Nothing to import: the bundle has no data rows.".to_string();
    }

    let mut rows: Vec<ImportRow> = results
        .iter()
        .map(|r| ImportRow {
            entity: r.entity.clone(),
            success: r.success,
            errors: r.errors,
            total: r.total,
        })
        .collect();
    rows.push(ImportRow {
        entity: "TOTAL".to_string(),
        success: results.iter().map(|r| r.success).sum(),
        errors: results.iter().map(|r| r.errors).sum(),
        total: results.iter().map(|r| r.total).sum(),
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');

    let failed: Vec<&ImportResult> = results.iter().filter(|r| r.errors > 0).collect();
    if !failed.is_empty() {
        output.push_str("\nRejected rows:\n");
        for result in failed {
            for failure in &result.failures {
                output.push_str(&format!(
                    "  {} line {}: {}\n",
                    result.entity, failure.line, failure.message
                ));
            }
        }
    }

    output
}

/// One-line rendering of a progress event, `None` for events not worth a line
pub fn format_import_event(event: &ImportEvent) -> Option<String> {
    match event {
        ImportEvent::EntityStarted { kind, rows } => {
            Some(format!("Importing {} ({} rows)...", kind.label(), rows))
        }
        ImportEvent::EntityFinished(result) => Some(format!(
            "  {}: {} imported, {} failed",
            result.entity, result.success, result.errors
        )),
        ImportEvent::Progress(_) => None,
        ImportEvent::Cancelled => Some("Import cancelled.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use crate::services::{RowFailure, RowOutcome};

    #[test]
    fn test_format_results_with_failures() {
        let result = ImportResult::from_outcomes(
            EntityKind::Courses,
            vec![
                (2, RowOutcome::Ok("CURSO001".into())),
                (3, RowOutcome::Failed("column 'price': not a number".into())),
            ],
        );

        let output = format_import_results(&[result]);

        assert!(output.contains("Courses"));
        assert!(output.contains("TOTAL"));
        assert!(output.contains("Rejected rows:"));
        assert!(output.contains("Courses line 3: column 'price': not a number"));
    }

    #[test]
    fn test_format_empty_results() {
        assert!(format_import_results(&[]).contains("Nothing to import"));
    }

    #[test]
    fn test_format_events() {
        let started = ImportEvent::EntityStarted {
            kind: EntityKind::Students,
            rows: 12,
        };
        assert_eq!(
            format_import_event(&started).unwrap(),
            "Importing Students (12 rows)..."
        );
        assert!(format_import_event(&ImportEvent::Progress(50)).is_none());

        let failure = RowFailure {
            line: 4,
            message: "x".into(),
        };
        let finished = ImportEvent::EntityFinished(ImportResult {
            kind: EntityKind::Students,
            entity: "Students".into(),
            success: 11,
            errors: 1,
            total: 12,
            failures: vec![failure],
        });
        assert_eq!(
            format_import_event(&finished).unwrap(),
            "  Students: 11 imported, 1 failed"
        );
    }
}

//! Import orchestrator
//!
//! Drives a bundle into the entity store one entity at a time, in ascending
//! dependency rank, so that referenced records exist before the rows that
//! point at them. Rows of a single entity may be spread over scoped worker
//! threads. Progress is published as `ImportEvent`s; a `CancellationToken`
//! is checked between entities.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::bundle::{Bundle, Sheet};
use crate::config::Settings;
use crate::error::AcademyResult;
use crate::models::{in_dependency_order, EntityDescriptor, EntityKind, RawRow};
use crate::storage::EntityStore;

use super::importer::{import_row, RowOutcome};
use super::normalizer::Normalizer;

/// A row that was not stored, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// Sheet line of the row (the header is line 1)
    pub line: usize,
    pub message: String,
}

/// Per-entity tally of an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    #[serde(skip)]
    pub kind: EntityKind,
    pub entity: String,
    pub success: usize,
    pub errors: usize,
    pub total: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportResult {
    /// Fold row outcomes into a result; `total` always equals `success + errors`
    pub fn from_outcomes(kind: EntityKind, outcomes: Vec<(usize, RowOutcome)>) -> Self {
        let mut result = Self {
            kind,
            entity: kind.label().to_string(),
            success: 0,
            errors: 0,
            total: 0,
            failures: Vec::new(),
        };

        for (line, outcome) in outcomes {
            match outcome {
                RowOutcome::Ok(_) => result.success += 1,
                RowOutcome::Failed(message) => {
                    result.errors += 1;
                    result.failures.push(RowFailure { line, message });
                }
            }
        }
        result.total = result.success + result.errors;
        result
    }
}

/// Progress notifications emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    EntityStarted { kind: EntityKind, rows: usize },
    EntityFinished(ImportResult),
    /// Percentage of present entities completed, 0-100
    Progress(u8),
    /// The run stopped early; the returned results are incomplete
    Cancelled,
}

/// Shared flag for stopping a run between entities
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Dependency-ordered bundle importer
pub struct ImportOrchestrator<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    settings: &'a Settings,
    events: Option<Sender<ImportEvent>>,
    cancel: CancellationToken,
}

impl<'a, S: EntityStore + ?Sized> ImportOrchestrator<'a, S> {
    pub fn new(store: &'a S, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Publish progress events on `sender`
    pub fn with_events(mut self, sender: Sender<ImportEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }

    /// Import every entity sheet of the bundle
    ///
    /// Returns one result per entity that had at least one non-placeholder
    /// row, in import order. Row failures are counted, never raised.
    pub fn run(&self, bundle: &Bundle) -> AcademyResult<Vec<ImportResult>> {
        let plan: Vec<(&EntityDescriptor, &Sheet)> = in_dependency_order()
            .into_iter()
            .filter_map(|descriptor| bundle.sheet_for(descriptor.kind).map(|s| (descriptor, s)))
            .collect();

        for name in bundle.unrecognized_sheets() {
            debug!(sheet = name, "sheet matches no entity; skipping");
        }
        info!(entities = plan.len(), rows = bundle.total_rows(), "import started");

        let present = plan.len();
        let mut results = Vec::with_capacity(present);

        if present == 0 {
            self.emit(ImportEvent::Progress(100));
            return Ok(results);
        }

        for (done, (descriptor, sheet)) in plan.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(completed = results.len(), "import cancelled");
                self.emit(ImportEvent::Cancelled);
                return Ok(results);
            }

            if let Some(result) = self.import_sheet(descriptor.kind, sheet) {
                self.emit(ImportEvent::EntityFinished(result.clone()));
                results.push(result);
            }
            self.emit(ImportEvent::Progress(((done + 1) * 100 / present) as u8));
        }

        info!(entities = results.len(), "import finished");
        Ok(results)
    }

    /// Import one sheet; `None` when only placeholder rows remain
    fn import_sheet(&self, kind: EntityKind, sheet: &Sheet) -> Option<ImportResult> {
        let normalizer = Normalizer::new(kind, self.settings);
        for column in normalizer.unknown_headers(&sheet.headers) {
            debug!(entity = %kind, column, "column has no canonical mapping; passing through");
        }

        let rows: Vec<RawRow> = sheet
            .raw_rows()
            .into_iter()
            .filter(|row| !row.is_blank() && !self.is_placeholder(row))
            .collect();
        if rows.is_empty() {
            debug!(entity = %kind, "no data rows");
            return None;
        }

        self.emit(ImportEvent::EntityStarted {
            kind,
            rows: rows.len(),
        });

        let outcomes = import_rows(self.store, &normalizer, &rows, self.settings.import_workers);
        let result = ImportResult::from_outcomes(kind, outcomes);

        if let Err(e) = self.store.flush() {
            error!(entity = %kind, error = %e, "failed to persist entity");
        }
        info!(
            entity = %kind,
            success = result.success,
            errors = result.errors,
            "entity imported"
        );
        Some(result)
    }

    /// Whether a row is the template's example row
    fn is_placeholder(&self, row: &RawRow) -> bool {
        row.first_cell()
            .map(|cell| self.settings.is_example_marker(&cell.as_text()))
            .unwrap_or(false)
    }
}

/// Normalize and store rows, optionally over `workers` scoped threads
///
/// Outcomes come back in row order whatever the worker count.
fn import_rows<S: EntityStore + ?Sized>(
    store: &S,
    normalizer: &Normalizer,
    rows: &[RawRow],
    workers: usize,
) -> Vec<(usize, RowOutcome)> {
    let workers = workers.clamp(1, rows.len().max(1));
    if workers == 1 {
        return rows
            .iter()
            .map(|row| (row.line, import_one(store, normalizer, row)))
            .collect();
    }

    let chunk_size = (rows.len() + workers - 1) / workers;
    thread::scope(|scope| {
        let handles: Vec<_> = rows
            .chunks(chunk_size)
            .map(|part| {
                let handle = scope.spawn(move || {
                    part.iter()
                        .map(|row| (row.line, import_one(store, normalizer, row)))
                        .collect::<Vec<_>>()
                });
                (part, handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(part, handle)| match handle.join() {
                Ok(outcomes) => outcomes,
                Err(_) => part
                    .iter()
                    .map(|row| (row.line, RowOutcome::Failed("import worker panicked".into())))
                    .collect(),
            })
            .collect()
    })
}

fn import_one<S: EntityStore + ?Sized>(
    store: &S,
    normalizer: &Normalizer,
    row: &RawRow,
) -> RowOutcome {
    match normalizer.normalize(row) {
        Ok(payload) => import_row(store, normalizer.kind(), &payload),
        Err(e) => {
            warn!(entity = %normalizer.kind(), row = row.line, error = %e, "row failed normalization");
            RowOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcademyError;
    use crate::models::{CellValue, NormalizedPayload, Record};
    use std::sync::mpsc;
    use std::sync::Mutex;

    /// Store that records the order of upserts and rejects selected names
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<EntityKind>>,
        reject_name: Option<String>,
    }

    impl EntityStore for RecordingStore {
        fn list_all(&self, _kind: EntityKind) -> AcademyResult<Vec<Record>> {
            Ok(Vec::new())
        }

        fn upsert(&self, kind: EntityKind, payload: &NormalizedPayload) -> AcademyResult<Record> {
            self.calls.lock().unwrap().push(kind);
            let name = payload.get("name").map(|v| v.to_string());
            if name.is_some() && name == self.reject_name {
                return Err(AcademyError::Storage("connection reset".into()));
            }
            Ok(Record::new(payload.id().unwrap_or("generated")))
        }
    }

    fn sheet(name: &str, headers: &[&str], rows: &[&[&str]]) -> Sheet {
        let mut sheet = Sheet::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            sheet.push_row(row.iter().map(|c| CellValue::from_text(c)).collect());
        }
        sheet
    }

    #[test]
    fn test_entities_run_in_dependency_order() {
        let store = RecordingStore::default();
        let settings = Settings::default();
        let bundle = Bundle::new(
            None,
            vec![
                sheet("Payments", &["id", "amount"], &[&["PAG001", "300"]]),
                sheet("Enrollments", &["id", "studentId"], &[&["MAT001", "EST001"]]),
                sheet("Courses", &["id", "title"], &[&["CURSO001", "Inglés"]]),
                sheet("Students", &["id", "name"], &[&["EST001", "Ana"]]),
            ],
        );

        let results = ImportOrchestrator::new(&store, &settings).run(&bundle).unwrap();

        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                EntityKind::Students,
                EntityKind::Courses,
                EntityKind::Enrollments,
                EntityKind::Payments
            ]
        );
        let labels: Vec<_> = results.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(labels, vec!["Students", "Courses", "Enrollments", "Payments"]);
    }

    #[test]
    fn test_placeholder_rows_are_dropped() {
        let store = RecordingStore::default();
        let settings = Settings::default();
        let bundle = Bundle::new(
            None,
            vec![
                sheet(
                    "Students",
                    &["id*", "Nombre*"],
                    &[&["EJEMPLO-EST001", "Ana (ejemplo)"], &["EST002", "Luis"]],
                ),
                sheet("Teachers", &["id*", "Nombre*"], &[&["Example", "Laura"]]),
            ],
        );

        let results = ImportOrchestrator::new(&store, &settings).run(&bundle).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, EntityKind::Students);
        assert_eq!(results[0].total, 1);
    }

    #[test]
    fn test_row_failures_do_not_stop_the_run() {
        let store = RecordingStore {
            reject_name: Some("Roto".into()),
            ..Default::default()
        };
        let settings = Settings::default();
        let bundle = Bundle::new(
            None,
            vec![sheet(
                "Courses",
                &["id", "title", "price"],
                &[
                    &["C1", "Inglés", "300"],
                    &["C2", "Roto", "100"],
                    &["C3", "Francés", "abc"],
                    &["C4", "Alemán", "250"],
                ],
            )],
        );

        let results = ImportOrchestrator::new(&store, &settings).run(&bundle).unwrap();

        assert_eq!(results.len(), 1);
        let courses = &results[0];
        assert_eq!(courses.success, 2);
        assert_eq!(courses.errors, 2);
        assert_eq!(courses.total, courses.success + courses.errors);
        let lines: Vec<_> = courses.failures.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        let store = RecordingStore::default();
        let settings = Settings::default();
        let bundle = Bundle::new(
            None,
            vec![
                sheet("Students", &["id", "name"], &[&["EST001", "Ana"]]),
                sheet("Courses", &["id", "title"], &[&["CURSO001", "Inglés"]]),
                sheet("Software", &["id", "name"], &[&["EJEMPLO", "Zoom"]]),
            ],
        );
        let (tx, rx) = mpsc::channel();

        ImportOrchestrator::new(&store, &settings)
            .with_events(tx)
            .run(&bundle)
            .unwrap();

        let progress: Vec<u8> = rx
            .try_iter()
            .filter_map(|e| match e {
                ImportEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![33, 66, 100]);
    }

    #[test]
    fn test_cancellation_stops_between_entities() {
        let store = RecordingStore::default();
        let settings = Settings::default();
        let bundle = Bundle::new(
            None,
            vec![sheet("Students", &["id", "name"], &[&["EST001", "Ana"]])],
        );
        let token = CancellationToken::new();
        token.cancel();
        let (tx, rx) = mpsc::channel();

        let results = ImportOrchestrator::new(&store, &settings)
            .with_events(tx)
            .with_cancellation(token)
            .run(&bundle)
            .unwrap();

        assert!(results.is_empty());
        assert!(store.calls.lock().unwrap().is_empty());
        assert!(rx.try_iter().any(|e| e == ImportEvent::Cancelled));
    }

    #[test]
    fn test_parallel_workers_keep_row_order() {
        let store = RecordingStore {
            reject_name: Some("Roto".into()),
            ..Default::default()
        };
        let settings = Settings {
            import_workers: 3,
            ..Settings::default()
        };
        let names = ["A", "B", "Roto", "D", "E", "Roto", "G"];
        let rows: Vec<Vec<&str>> = names.iter().map(|n| vec!["", *n]).collect();
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let bundle = Bundle::new(None, vec![sheet("Students", &["id", "name"], &row_refs)]);

        let results = ImportOrchestrator::new(&store, &settings).run(&bundle).unwrap();

        assert_eq!(results[0].success, 5);
        assert_eq!(results[0].errors, 2);
        let lines: Vec<_> = results[0].failures.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![4, 7]);
    }

    #[test]
    fn test_empty_bundle_reports_full_progress() {
        let store = RecordingStore::default();
        let settings = Settings::default();
        let (tx, rx) = mpsc::channel();

        let results = ImportOrchestrator::new(&store, &settings)
            .with_events(tx)
            .run(&Bundle::default())
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(rx.try_iter().last(), Some(ImportEvent::Progress(100)));
    }
}

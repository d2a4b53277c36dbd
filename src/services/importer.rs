//! Row importer
//!
//! Sends one normalized row to the entity store and classifies the outcome.
//! Store errors never escape: they are logged and returned as `Failed`.

use tracing::{error, warn};

use crate::models::{EntityKind, NormalizedPayload};
use crate::storage::EntityStore;

/// Outcome of importing a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The record was created or updated; carries its id
    Ok(String),
    Failed(String),
}

/// Create-or-update one record
pub fn import_row<S: EntityStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    payload: &NormalizedPayload,
) -> RowOutcome {
    match store.upsert(kind, payload) {
        Ok(record) => RowOutcome::Ok(record.id().to_string()),
        Err(e) if e.is_row_level() => {
            warn!(entity = %kind, id = payload.id().unwrap_or("-"), error = %e, "row rejected by store");
            RowOutcome::Failed(e.to_string())
        }
        Err(e) => {
            error!(entity = %kind, id = payload.id().unwrap_or("-"), error = %e, "store failure on row");
            RowOutcome::Failed(e.to_string())
        }
    }
}

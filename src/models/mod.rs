//! Core data models for the academy toolkit
//!
//! The entity catalog, the values and rows that flow through an import,
//! stored records, and the billing types produced by reconciliation.

pub mod billing;
pub mod entity;
pub mod money;
pub mod record;
pub mod row;
pub mod value;

pub use billing::{PaymentStatus, PriceUnit, TrackingInfo};
pub use entity::{in_dependency_order, EntityDescriptor, EntityKind, Reference, CATALOG};
pub use money::Money;
pub use record::Record;
pub use row::{NormalizedPayload, RawRow};
pub use value::{CellValue, FieldValue};

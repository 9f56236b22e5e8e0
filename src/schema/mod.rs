//! Record Schemas
//!
//! Field definitions, validation and the static record-kind table for the
//! three relief record kinds (disasters, donations, volunteers).

mod field;
mod records;
mod registry;
mod validate;

pub use field::{FieldDefault, FieldSpec, FieldType};
pub use records::{Disaster, Donation, Record, Volunteer};
pub use registry::{RecordKind, RecordSchemaInfo, RegistryInfo, SchemaRegistry};
pub use validate::{
    validate_document, ValidationError, ValidationMode, Violation, ViolationKind,
};

//! Schema Registry
//!
//! Static mapping from record kind to collection, schema and response
//! wording, plus the validation entry point used by every endpoint.

use crate::schema::field::FieldSpec;
use crate::schema::records::{Disaster, Donation, Record, Volunteer};
use crate::schema::validate::{
    validate_document, ValidationError, ValidationMode, Violation, ViolationKind,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Disaster,
    Donation,
    Volunteer,
}

struct RecordEntry {
    kind: RecordKind,
    name: &'static str,
    collection: &'static str,
    fields: &'static [FieldSpec],
    created_message: &'static str,
    default_list_limit: u32,
}

static RECORD_TABLE: [RecordEntry; 3] = [
    RecordEntry {
        kind: RecordKind::Disaster,
        name: "Disaster",
        collection: "disaster",
        fields: Disaster::FIELDS,
        created_message: "Disaster created",
        default_list_limit: 20,
    },
    RecordEntry {
        kind: RecordKind::Donation,
        name: "Donation",
        collection: "donation",
        fields: Donation::FIELDS,
        created_message: "Donation received. Thank you!",
        default_list_limit: 50,
    },
    RecordEntry {
        kind: RecordKind::Volunteer,
        name: "Volunteer",
        collection: "volunteer",
        fields: Volunteer::FIELDS,
        created_message: "Volunteer registered. Salamat!",
        default_list_limit: 50,
    },
];

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Disaster,
        RecordKind::Donation,
        RecordKind::Volunteer,
    ];

    /// Record kind stored in `collection`, if any
    pub fn from_collection(collection: &str) -> Option<RecordKind> {
        RECORD_TABLE
            .iter()
            .find(|entry| entry.collection == collection)
            .map(|entry| entry.kind)
    }

    fn entry(&self) -> &'static RecordEntry {
        let index = match self {
            RecordKind::Disaster => 0,
            RecordKind::Donation => 1,
            RecordKind::Volunteer => 2,
        };
        &RECORD_TABLE[index]
    }

    pub fn name(&self) -> &'static str {
        self.entry().name
    }

    /// Collection the records of this kind are stored in
    pub fn collection(&self) -> &'static str {
        self.entry().collection
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.entry().fields
    }

    pub fn created_message(&self) -> &'static str {
        self.entry().created_message
    }

    pub fn default_list_limit(&self) -> u32 {
        self.entry().default_list_limit
    }
}

/// Validates request bodies against the record schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    mode: ValidationMode,
}

#[derive(Debug, Serialize)]
pub struct RecordSchemaInfo {
    pub name: &'static str,
    pub collection: &'static str,
    pub fields: &'static [FieldSpec],
}

#[derive(Debug, Serialize)]
pub struct RegistryInfo {
    pub validation_mode: ValidationMode,
    pub records: Vec<RecordSchemaInfo>,
}

impl SchemaRegistry {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate a raw body into a typed record
    pub fn validate<R: Record>(&self, input: &Value) -> Result<R, ValidationError> {
        let kind = R::KIND;
        let document = validate_document(kind.name(), R::FIELDS, input, self.mode)?;

        serde_json::from_value(Value::Object(document)).map_err(|e| {
            ValidationError::single(
                kind.name(),
                Violation::new("body", ViolationKind::InvalidBody, e.to_string()),
            )
        })
    }

    pub fn describe(&self) -> RegistryInfo {
        RegistryInfo {
            validation_mode: self.mode,
            records: RecordKind::ALL
                .iter()
                .map(|kind| RecordSchemaInfo {
                    name: kind.name(),
                    collection: kind.collection(),
                    fields: kind.fields(),
                })
                .collect(),
        }
    }
}

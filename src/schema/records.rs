//! Relief record types
//!
//! Typed forms of the three record kinds. Instances are only built from
//! documents that already passed [`validate_document`](super::validate_document),
//! so deserialization is not where input errors are reported.

use crate::schema::field::{FieldDefault, FieldSpec, FieldType};
use crate::schema::registry::RecordKind;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record kind that can be validated and persisted generically
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: RecordKind;
    const FIELDS: &'static [FieldSpec];
}

pub(crate) const SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];
pub(crate) const DISASTER_STATUSES: &[&str] = &["ongoing", "resolved", "monitoring"];
pub(crate) const DONATION_TYPES: &[&str] = &["money", "food", "supplies"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disaster {
    pub title: String,
    pub description: String,
    pub location: String,
    pub severity: String,
    pub status: String,
    pub date: Option<DateTime<Utc>>,
}

impl Record for Disaster {
    const KIND: RecordKind = RecordKind::Disaster;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("title", FieldType::String, "Name of the disaster"),
        FieldSpec::required("description", FieldType::String, "Short summary of the situation"),
        FieldSpec::required("location", FieldType::String, "Affected location"),
        FieldSpec::required("severity", FieldType::String, "Severity level: low/medium/high/critical")
            .with_allowed(SEVERITIES),
        FieldSpec::optional("status", FieldType::String, "Status: ongoing/resolved/monitoring")
            .with_default(FieldDefault::Text("ongoing"))
            .non_null()
            .with_allowed(DISASTER_STATUSES),
        FieldSpec::optional("date", FieldType::DateTime, "Reported date")
            .with_default(FieldDefault::Now),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub donation_type: String,
    pub amount: Option<f64>,
    pub items: Option<String>,
    pub message: Option<String>,
    pub disaster_id: Option<String>,
}

impl Record for Donation {
    const KIND: RecordKind = RecordKind::Donation;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", FieldType::String, "Donor full name"),
        FieldSpec::required("email", FieldType::String, "Donor email"),
        FieldSpec::required("type", FieldType::String, "Type of help: money/food/supplies")
            .with_allowed(DONATION_TYPES),
        FieldSpec::optional("amount", FieldType::Number, "Amount in USD for money donations")
            .with_minimum(0.0),
        FieldSpec::optional("items", FieldType::String, "List of items for food/supplies"),
        FieldSpec::optional("message", FieldType::String, "Optional note from the donor"),
        FieldSpec::optional("disaster_id", FieldType::String, "Related disaster id if applicable"),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volunteer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub availability: Option<String>,
    pub location: Option<String>,
    pub disaster_id: Option<String>,
}

impl Record for Volunteer {
    const KIND: RecordKind = RecordKind::Volunteer;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", FieldType::String, "Volunteer full name"),
        FieldSpec::required("email", FieldType::String, "Volunteer email"),
        FieldSpec::optional("phone", FieldType::String, "Contact number"),
        FieldSpec::optional(
            "skills",
            FieldType::StringList,
            "Skills to help (first aid, logistics, cooking, etc.)",
        ),
        FieldSpec::optional("availability", FieldType::String, "When they can help"),
        FieldSpec::optional("location", FieldType::String, "Preferred location to help"),
        FieldSpec::optional("disaster_id", FieldType::String, "Related disaster id if any"),
    ];
}

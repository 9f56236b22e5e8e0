//! Document Validation
//!
//! Checks a raw JSON body against a record schema and builds the document to
//! persist. Every violated constraint is collected; validation never stops at
//! the first failure.

use crate::schema::field::{FieldDefault, FieldSpec, FieldType};
use crate::store::Document;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

/// How strictly enum-like string fields are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Enum-like fields are free text
    #[default]
    Permissive,
    /// Enum-like fields must be one of their allowed values
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    WrongType,
    OutOfRange,
    NotAllowed,
    InvalidBody,
}

/// A single violated constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{} validation error(s) for {record}", .violations.len())]
pub struct ValidationError {
    pub record: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(record: impl Into<String>, violation: Violation) -> Self {
        Self {
            record: record.into(),
            violations: vec![violation],
        }
    }

    pub fn has_violation(&self, field: &str, kind: ViolationKind) -> bool {
        self.violations
            .iter()
            .any(|v| v.field == field && v.kind == kind)
    }
}

/// Validate `input` against `fields`, returning the document to store.
///
/// Keys not named by the schema are dropped. Absent optional fields take their
/// default; an explicit `null` on a nullable optional field is kept as `null`.
pub fn validate_document(
    record: &str,
    fields: &[FieldSpec],
    input: &Value,
    mode: ValidationMode,
) -> Result<Document, ValidationError> {
    let Some(object) = input.as_object() else {
        return Err(ValidationError::single(
            record,
            Violation::new("body", ViolationKind::WrongType, "Input should be a valid object"),
        ));
    };

    let mut document = Document::new();
    let mut violations = Vec::new();

    for spec in fields {
        match object.get(spec.name) {
            None | Some(Value::Null) if spec.required => {
                violations.push(Violation::new(spec.name, ViolationKind::Missing, "Field required"));
            }
            None => {
                document.insert(spec.name.to_string(), default_value(spec));
            }
            Some(Value::Null) if !spec.nullable => {
                violations.push(Violation::new(
                    spec.name,
                    ViolationKind::WrongType,
                    format!("Input should be {}", spec.field_type.expected()),
                ));
            }
            Some(Value::Null) => {
                document.insert(spec.name.to_string(), Value::Null);
            }
            Some(value) => match check_field(spec, value, mode) {
                Ok(coerced) => {
                    document.insert(spec.name.to_string(), coerced);
                }
                Err(mut field_violations) => violations.append(&mut field_violations),
            },
        }
    }

    if violations.is_empty() {
        Ok(document)
    } else {
        Err(ValidationError {
            record: record.to_string(),
            violations,
        })
    }
}

fn default_value(spec: &FieldSpec) -> Value {
    match spec.default {
        Some(FieldDefault::Text(text)) => Value::String(text.to_string()),
        Some(FieldDefault::Now) => Value::String(format_timestamp(Utc::now())),
        Some(FieldDefault::Null) | None => Value::Null,
    }
}

fn check_field(
    spec: &FieldSpec,
    value: &Value,
    mode: ValidationMode,
) -> Result<Value, Vec<Violation>> {
    let coerced = coerce(spec, value)?;
    let mut violations = Vec::new();

    if let Some(number) = coerced.as_f64() {
        if let Some(minimum) = spec.minimum {
            if number < minimum {
                violations.push(Violation::new(
                    spec.name,
                    ViolationKind::OutOfRange,
                    format!("Input should be greater than or equal to {}", minimum),
                ));
            }
        }
        if let Some(maximum) = spec.maximum {
            if number > maximum {
                violations.push(Violation::new(
                    spec.name,
                    ViolationKind::OutOfRange,
                    format!("Input should be less than or equal to {}", maximum),
                ));
            }
        }
    }

    if mode == ValidationMode::Strict {
        if let (Some(allowed), Some(text)) = (spec.allowed, coerced.as_str()) {
            if !allowed.contains(&text) {
                violations.push(Violation::new(
                    spec.name,
                    ViolationKind::NotAllowed,
                    format!("Input should be {}", describe_allowed(allowed)),
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(coerced)
    } else {
        Err(violations)
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<Value, Vec<Violation>> {
    let wrong_type = || {
        vec![Violation::new(
            spec.name,
            ViolationKind::WrongType,
            format!("Input should be {}", spec.field_type.expected()),
        )]
    };

    match spec.field_type {
        FieldType::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(wrong_type()),
        },
        FieldType::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            number
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(wrong_type)
        }
        FieldType::DateTime => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| Value::String(format_timestamp(ts)))
            .ok_or_else(wrong_type),
        FieldType::StringList => {
            let Some(items) = value.as_array() else {
                return Err(wrong_type());
            };
            let violations: Vec<Violation> = items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_string())
                .map(|(i, _)| {
                    Violation::new(
                        format!("{}[{}]", spec.name, i),
                        ViolationKind::WrongType,
                        "Input should be a valid string",
                    )
                })
                .collect();
            if violations.is_empty() {
                Ok(value.clone())
            } else {
                Err(violations)
            }
        }
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (UTC) or a bare date.
fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn describe_allowed(allowed: &[&str]) -> String {
    let quoted: Vec<String> = allowed.iter().map(|v| format!("'{}'", v)).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => "one of no values".to_string(),
    }
}

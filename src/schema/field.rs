//! Field Definitions
//!
//! A record schema is a static slice of [`FieldSpec`]s. Specs are built with
//! const constructors so every schema can live in a `static`.

use serde::Serialize;

/// Wire type a field value must coerce to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// JSON string
    String,
    /// Finite number; numeric strings are accepted
    Number,
    /// Timestamp, stored as RFC 3339 in UTC
    DateTime,
    /// JSON array of strings
    StringList,
}

impl FieldType {
    pub fn expected(&self) -> &'static str {
        match self {
            FieldType::String => "a valid string",
            FieldType::Number => "a valid number",
            FieldType::DateTime => "a valid datetime",
            FieldType::StringList => "a valid list of strings",
        }
    }
}

/// Value used when an optional field is absent from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FieldDefault {
    Null,
    Text(&'static str),
    /// Current time at validation
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    /// Whether an explicit `null` is accepted
    pub nullable: bool,
    /// Inclusive lower bound for numeric fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numeric fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
    /// Closed set of values, only enforced in strict mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<&'static [&'static str]>,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            required: true,
            nullable: false,
            minimum: None,
            maximum: None,
            default: None,
            allowed: None,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            field_type,
            required: false,
            nullable: true,
            minimum: None,
            maximum: None,
            default: Some(FieldDefault::Null),
            allowed: None,
            description,
        }
    }

    /// Optional but, when present, must not be `null`
    pub const fn non_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub const fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn with_allowed(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_defaults_to_null() {
        let spec = FieldSpec::optional("phone", FieldType::String, "Contact number");
        assert!(!spec.required);
        assert_eq!(spec.default, Some(FieldDefault::Null));

        let spec = spec.with_default(FieldDefault::Text("ongoing"));
        assert_eq!(spec.default, Some(FieldDefault::Text("ongoing")));
    }

    #[test]
    fn test_spec_serializes_for_schema_listing() {
        let spec = FieldSpec::optional("amount", FieldType::Number, "Amount in USD")
            .with_minimum(0.0);
        let json = serde_json::to_value(spec).unwrap();

        assert_eq!(json["type"], "number");
        assert_eq!(json["minimum"], 0.0);
        assert_eq!(json["default"]["kind"], "null");
        assert!(json.get("maximum").is_none());
        assert!(json.get("allowed").is_none());
    }
}

//! CLI tool to display the record schemas
//!
//! Usage:
//!   cargo run --bin schema-dump
//!   cargo run --bin schema-dump -- --strict
//!   cargo run --bin schema-dump -- donation

use bayanihan_relief::schema::{FieldSpec, RecordKind, SchemaRegistry, ValidationMode};
use std::env;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let mode = if args.iter().any(|a| a == "--strict") {
        ValidationMode::Strict
    } else {
        ValidationMode::Permissive
    };
    let selected: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    if selected.is_empty() {
        // Full registry as JSON
        let registry = SchemaRegistry::new(mode);
        match serde_json::to_string_pretty(&registry.describe()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize schema registry: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for name in selected {
        let Some(kind) = RecordKind::from_collection(&name.to_lowercase()) else {
            eprintln!("Unknown record kind: {}", name);
            eprintln!("Known kinds: disaster, donation, volunteer");
            std::process::exit(1);
        };

        println!("{} (collection \"{}\")", kind.name(), kind.collection());
        for field in kind.fields() {
            println!("  {}", describe_field(field, mode));
        }
        println!();
    }
}

fn describe_field(field: &FieldSpec, mode: ValidationMode) -> String {
    let mut line = format!(
        "{:<14} {:<12} {}",
        field.name,
        format!("{:?}", field.field_type),
        if field.required { "required" } else { "optional" }
    );

    if let Some(minimum) = field.minimum {
        line.push_str(&format!(", >= {}", minimum));
    }
    if let Some(maximum) = field.maximum {
        line.push_str(&format!(", <= {}", maximum));
    }
    if let (ValidationMode::Strict, Some(allowed)) = (mode, field.allowed) {
        line.push_str(&format!(", one of [{}]", allowed.join(", ")));
    }
    line.push_str(&format!("  - {}", field.description));
    line
}

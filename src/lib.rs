//! Bayanihan Relief API
//!
//! HTTP endpoints for disaster reports, donations and volunteer
//! registrations. Every endpoint validates its body against a fixed record
//! schema and persists to, or lists from, a document store.

pub mod api;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;

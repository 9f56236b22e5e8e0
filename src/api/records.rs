//! Record endpoints
//!
//! One generic create and one generic list handler, instantiated per record
//! kind in the router:
//! - POST /api/{kind}s - validate and store a record
//! - GET  /api/{kind}s?limit=N - list stored records

use crate::api::AppState;
use crate::error::{ApiError, Result};
use crate::schema::{Record, ValidationError, Violation, ViolationKind};
use crate::store::{document_id, reshape_identifier, Document};
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
    pub message: String,
}

pub async fn create_record<R: Record>(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, ApiError>,
) -> Result<Json<CreatedResponse>> {
    let kind = R::KIND;
    let collection = kind.collection();

    // Validate before touching the store so bad input never reaches it
    let record: R = state.registry.validate(&body)?;
    let store = state.store()?;

    let document = match serde_json::to_value(&record) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ApiError::Internal(format!(
                "{} serialized to a non-object: {}",
                kind.name(),
                other
            )))
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    let created = store.create_document(collection, document).await?;
    let id = document_id(&created).ok_or_else(|| ApiError::Persistence {
        collection: collection.to_string(),
        cause: "store returned no identifier".to_string(),
    })?;

    info!("Created {} record {} in '{}'", kind.name(), id, collection);

    Ok(Json(CreatedResponse {
        id,
        message: kind.created_message().to_string(),
    }))
}

pub async fn list_records<R: Record>(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<Vec<Document>>> {
    let kind = R::KIND;
    let limit = resolve_limit(
        query.limit,
        kind.default_list_limit(),
        state.config.max_list_limit,
    )?;

    let store = state.store()?;
    let documents = store
        .get_documents(kind.collection(), &Document::new(), limit)
        .await?;

    debug!(
        "Listed {} {} records (limit {})",
        documents.len(),
        kind.name(),
        limit
    );

    Ok(Json(documents.into_iter().map(reshape_identifier).collect()))
}

/// Missing limits take the kind's default; every limit is clamped to `max`.
fn resolve_limit(
    requested: Option<i64>,
    default: u32,
    max: u32,
) -> std::result::Result<u32, ValidationError> {
    match requested {
        None => Ok(default.min(max)),
        Some(n) if n < 0 => Err(ValidationError::single(
            "query",
            Violation::new(
                "limit",
                ViolationKind::OutOfRange,
                "Input should be greater than or equal to 0",
            ),
        )),
        Some(n) => Ok(u32::try_from(n).unwrap_or(u32::MAX).min(max)),
    }
}

use axum::{
    body::Body,
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

use crate::models::QueryRequest;
use crate::services::StreamOrchestrator;
use crate::utils::error::ApiError;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// POST /api/v1/query: one JSON record per line, streamed as produced.
pub async fn query_handler(
    Extension(orchestrator): Extension<Arc<StreamOrchestrator>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    info!(
        "Query request: has_session={}, max_results={:?}",
        request.session_id.is_some(),
        request.max_results
    );

    let records = orchestrator
        .process(request.query, request.session_id, request.max_results)
        .map(|record| Ok::<_, Infallible>(Bytes::from(record.to_ndjson())));

    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(records),
    )
        .into_response())
}

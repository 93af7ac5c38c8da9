use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::services::StreamOrchestrator;
use crate::utils::error::ApiError;

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::InternalError(format!("Handler panicked: {}", detail)).into_response()
}

pub fn build_router(orchestrator: Arc<StreamOrchestrator>) -> Router {
    let history = Arc::clone(orchestrator.history());

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        .route("/api/v1/query", post(handlers::query::query_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(Extension(orchestrator))
        .layer(Extension(history))
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CatchPanicLayer::custom(handle_panic))
}

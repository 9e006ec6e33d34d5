//! HTTP surface: route table, request/response glue, and validation.

pub mod handlers;
pub mod routes;
pub mod validation;

use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::constants::server::MAX_BODY_BYTES;
use crate::context::transaction_id_middleware;
use crate::log::create_http_trace_layer;
use crate::services::Services;

/// Builds the full axum application: the route table plus the
/// cross-cutting layers every request passes through (CORS, a body-size
/// cap sized for batched block uploads, and the tracing span that tags
/// each request with its matched route).
pub fn create_app(services: Services) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::HEAD])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false);

    routes::routes(services)
        .layer(axum::middleware::from_fn(transaction_id_middleware))
        .layer(create_http_trace_layer::<axum::body::Body>())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

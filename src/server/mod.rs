//! Axum router hosting every endpoint.
//!
//! - `POST /applianceAssistant` (callable) chat, complete reply
//! - `POST /applianceAssistantStream` chat as server-sent events
//! - `POST /addNumbers` (callable) addition demo
//! - `/onRequestExampleAuth`, `/onRequestExampleNoAuth` plain HTTP demos

pub mod callable;
pub mod handlers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::routing::{any, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::llm::LlmService;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmService,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Build the application router.
///
/// `cors_origins` is a comma-separated list; `None` allows any origin.
pub fn build(state: AppState, cors_origins: Option<&str>) -> Router {
    Router::new()
        .route("/applianceAssistant", post(handlers::appliance_assistant))
        .route("/applianceAssistantStream", post(handlers::appliance_assistant_stream))
        .route("/addNumbers", post(handlers::add_numbers))
        .route("/onRequestExampleAuth", any(handlers::on_request_example_auth))
        .route("/onRequestExampleNoAuth", any(handlers::on_request_example_no_auth))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Outermost, so the id exists before the trace span is opened.
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(state)
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

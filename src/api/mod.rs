// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface of the gateway.
//!
//! Every route lives under the enclave prefix `/enclave/{ENCLAVE_NAME}`.
//! Anything that matches no route (including `/`), or matches one with the
//! wrong method, is redirected to the UI.

use axum::{
    extract::{MatchedPath, Request, State},
    routing::get,
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use utoipa::openapi::server::Server;
use utoipa::OpenApi;

use crate::{error::ErrorBody, state::AppState, upstream::VendorSummary};

pub mod health;
pub mod ingress;
pub mod sample;
pub mod session;
pub mod ui;

pub fn router(state: AppState) -> Router {
    let prefix = state.config.enclave_prefix();
    let at = |path: &str| format!("{prefix}{path}");

    Router::new()
        .route(&at("/health/startup"), get(health::startup))
        .route(&at("/health/liveliness"), get(health::liveliness))
        .route(&at("/health/readiness"), get(health::readiness))
        .route(&at("/ingress"), get(ingress::missing_token))
        .route(&at("/ingress/"), get(ingress::missing_token))
        .route(&at("/ingress/{token}"), get(ingress::ingress))
        .route(&at("/ui"), get(ui::index))
        .route(&at("/ui/"), get(ui::index))
        .route(&at("/ui/{*path}"), get(ui::index))
        .route(&at("/api/random"), get(sample::random))
        .route(&at("/protected/api/random"), get(sample::protected_random))
        .route(&at("/api-doc/openapi.json"), get(openapi_json))
        .nest_service(
            &at("/resources/dist"),
            ServeDir::new(&state.config.resources_dir),
        )
        .route("/", get(ui::redirect_to_ui))
        .fallback(ui::redirect_to_ui)
        .method_not_allowed_fallback(ui::redirect_to_ui)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Span per request. Uses the route template rather than the raw URI so
/// ingress tokens never reach the logs.
fn request_span(request: &Request) -> Span {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "http_request",
        method = %request.method(),
        path = %path,
        request_id = %request_id,
    )
}

async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(state.config.enclave_prefix())]);
    Json(doc)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::startup,
        health::liveliness,
        health::readiness,
        ingress::ingress,
        sample::random,
        sample::protected_random
    ),
    components(
        schemas(
            health::HealthResponse,
            sample::RandomResponse,
            sample::ProtectedRandomResponse,
            VendorSummary,
            ErrorBody
        )
    ),
    tags(
        (name = "Health", description = "Orchestrator probes"),
        (name = "Session", description = "Ingress and session cookies"),
        (name = "Sample", description = "Sample endpoints")
    )
)]
struct ApiDoc;

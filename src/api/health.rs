// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "OK".to_string(),
        })
    }
}

/// Startup probe.
#[utoipa::path(
    get,
    path = "/health/startup",
    tag = "Health",
    responses((status = 200, description = "Process has started", body = HealthResponse))
)]
pub async fn startup() -> Json<HealthResponse> {
    HealthResponse::ok()
}

/// Liveness probe.
///
/// Always returns 200 while the process is serving.
#[utoipa::path(
    get,
    path = "/health/liveliness",
    tag = "Health",
    responses((status = 200, description = "Process is alive", body = HealthResponse))
)]
pub async fn liveliness() -> Json<HealthResponse> {
    HealthResponse::ok()
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/readiness",
    tag = "Health",
    responses((status = 200, description = "Ready to serve", body = HealthResponse))
)]
pub async fn readiness() -> Json<HealthResponse> {
    HealthResponse::ok()
}

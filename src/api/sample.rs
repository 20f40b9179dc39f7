// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sample endpoints for front-end wiring checks.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use super::session::UserSession;
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;
use crate::upstream::VendorSummary;

#[derive(Debug, Serialize, ToSchema)]
pub struct RandomResponse {
    /// Uniform in `[0, 1)`.
    pub random: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProtectedRandomResponse {
    pub random: f64,
    /// Active vendors visible to the session's user.
    pub vendors: Vec<VendorSummary>,
}

#[utoipa::path(
    get,
    path = "/api/random",
    tag = "Sample",
    responses((status = 200, description = "A random number", body = RandomResponse))
)]
pub async fn random() -> Json<RandomResponse> {
    Json(RandomResponse {
        random: rand::random::<f64>(),
    })
}

/// Same as `/api/random`, plus an upstream call made with the user's credential.
#[utoipa::path(
    get,
    path = "/protected/api/random",
    tag = "Sample",
    responses(
        (status = 200, description = "Random number and active vendors", body = ProtectedRandomResponse),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 500, description = "Upstream call failed", body = ErrorBody)
    )
)]
pub async fn protected_random(
    State(state): State<AppState>,
    UserSession(session): UserSession,
) -> Result<Json<ProtectedRandomResponse>, ApiError> {
    let vendors = state
        .api
        .list_active_vendors(&session.credential)
        .await
        .map_err(|e| {
            warn!(error = %e, "Vendor listing failed");
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(ProtectedRandomResponse {
        random: rand::random::<f64>(),
        vendors,
    }))
}

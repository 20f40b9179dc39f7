// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use super::session::session_cookie;
use crate::error::{ApiError, ErrorBody};
use crate::ingress::IngressError;
use crate::state::AppState;

/// Exchange an ingress token for a session cookie and land on the UI.
#[utoipa::path(
    get,
    path = "/ingress/{token}",
    tag = "Session",
    params(("token" = String, Path, description = "Single-use ingress token")),
    responses(
        (status = 307, description = "Session cookie set, redirect to the UI"),
        (status = 400, description = "Missing token", body = ErrorBody),
        (status = 500, description = "Ingress verification failed", body = String, content_type = "text/plain"),
        (status = 503, description = "Service credential not yet available", body = String, content_type = "text/plain")
    )
)]
pub async fn ingress(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let issued = state.exchanger.exchange(&token).await?;

    let record = state.codec.issue(issued.credential, issued.max_age);
    let value = state.codec.encode(&record).map_err(|e| {
        error!(error = %e, "Failed to seal session cookie");
        ApiError::internal(e.to_string()).plain_text()
    })?;

    let cookie = session_cookie(state.codec.cookie_name(), &value, issued.max_age);
    Ok((
        [(SET_COOKIE, cookie)],
        Redirect::temporary(&state.config.ui_path()),
    )
        .into_response())
}

/// `{prefix}/ingress` and `{prefix}/ingress/` carry no token.
pub async fn missing_token() -> ApiError {
    IngressError::MissingToken.into()
}

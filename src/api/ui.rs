// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    response::{Html, Redirect},
};
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

/// SPA entry point for `{prefix}/ui` and every path below it.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    state.index.render().await.map(Html).map_err(|e| {
        error!(error = %e, "Failed to load index page");
        let message = if e.is_not_found() {
            "Index page not found."
        } else {
            "Error reading index page."
        };
        ApiError::internal(message).plain_text()
    })
}

/// `307` to the UI; used for `/` and as the router fallback.
pub async fn redirect_to_ui(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.config.ui_path())
}

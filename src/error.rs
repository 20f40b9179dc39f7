// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ingress::IngressError;

/// Body encoding for an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    /// `{"error": "<message>"}`
    Json,
    /// The bare message as `text/plain`.
    PlainText,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub format: ErrorFormat,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            format: ErrorFormat::Json,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Render this error as plain text instead of JSON.
    pub fn plain_text(mut self) -> Self {
        self.format = ErrorFormat::PlainText;
        self
    }
}

impl From<IngressError> for ApiError {
    fn from(err: IngressError) -> Self {
        let status = err.status_code();
        match err {
            IngressError::MissingToken => Self::bad_request(err.to_string()),
            _ => Self::new(status, err.to_string()).plain_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.format {
            ErrorFormat::Json => {
                let body = Json(ErrorBody {
                    error: self.message,
                });
                (self.status, body).into_response()
            }
            ErrorFormat::PlainText => (self.status, self.message).into_response(),
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie extractor and cookie construction.
//!
//! ```rust,ignore
//! async fn handler(UserSession(session): UserSession) -> impl IntoResponse {
//!     // session.credential is the user's upstream credential
//! }
//! ```

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

use crate::error::ApiError;
use crate::session::{clamp_max_age, SessionRecord};
use crate::state::AppState;

/// A verified, unexpired session for this enclave.
///
/// Rejects with `401 {"error":"Unauthorized"}` when the cookie is absent,
/// expired, tampered with or minted for another enclave.
pub struct UserSession(pub SessionRecord);

impl FromRequestParts<AppState> for UserSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let value = cookie_value(&parts.headers, state.codec.cookie_name())
            .ok_or_else(ApiError::unauthorized)?;

        state
            .codec
            .decode(value)
            .map(UserSession)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Find `name` across every `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value for a session cookie.
pub fn session_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{name}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        clamp_max_age(max_age).as_secs()
    )
}

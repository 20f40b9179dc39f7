// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ingress Exchanger
//!
//! Turns a single-use ingress token into a credential for the user's session
//! cookie.
//!
//! - **Production**: the token is verified upstream, authorized with the
//!   current service credential. The grant's absolute expiry becomes the
//!   session max-age, capped at [`SESSION_MAX_AGE`].
//! - **Development**: no upstream call. The session carries the service
//!   credential itself for [`DEV_SESSION_MAX_AGE`].

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::RuntimeMode;
use crate::credentials::CredentialStore;
use crate::session::{clamp_max_age, SESSION_MAX_AGE};
use crate::upstream::{IdentityApi, UpstreamError};

/// Session lifetime handed out by the development bypass.
pub const DEV_SESSION_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("Missing token")]
    MissingToken,

    #[error("service credential not yet available")]
    CredentialUnavailable,

    #[error("ingress verification failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("ingress grant already expired")]
    Expired,
}

impl IngressError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngressError::MissingToken => StatusCode::BAD_REQUEST,
            IngressError::CredentialUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::Upstream(_) | IngressError::Expired => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Credential and lifetime to install into the session cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub credential: String,
    pub max_age: Duration,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("credential", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

pub struct IngressExchanger {
    api: Arc<dyn IdentityApi>,
    credentials: CredentialStore,
    mode: RuntimeMode,
}

impl IngressExchanger {
    pub fn new(api: Arc<dyn IdentityApi>, credentials: CredentialStore, mode: RuntimeMode) -> Self {
        Self {
            api,
            credentials,
            mode,
        }
    }

    pub async fn exchange(&self, ingress_token: &str) -> Result<IssuedSession, IngressError> {
        if ingress_token.trim().is_empty() {
            return Err(IngressError::MissingToken);
        }

        let service = self
            .credentials
            .get()
            .ok_or(IngressError::CredentialUnavailable)?;

        if !self.mode.is_production() {
            info!(
                generation = service.generation(),
                "Issuing development session with the service credential"
            );
            return Ok(IssuedSession {
                credential: service.token().to_string(),
                max_age: DEV_SESSION_MAX_AGE,
            });
        }

        let grant = self
            .api
            .verify_ingress(ingress_token, service.token())
            .await
            .inspect_err(|e| warn!(error = %e, "Ingress verification failed"))?;

        let remaining = grant.expires_at - Utc::now().timestamp();
        if remaining <= 0 {
            warn!(expires_at = grant.expires_at, "Ingress grant already expired");
            return Err(IngressError::Expired);
        }

        let max_age = clamp_max_age(Duration::from_secs(remaining as u64));
        info!(
            max_age_secs = max_age.as_secs(),
            capped = max_age == SESSION_MAX_AGE,
            "Ingress token verified"
        );
        Ok(IssuedSession {
            credential: grant.auth_token,
            max_age,
        })
    }
}

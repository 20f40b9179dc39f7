// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Login Refresher
//!
//! Background task that keeps the [`CredentialStore`] populated with a fresh
//! service credential.
//!
//! ## Schedule
//!
//! - One login attempt immediately on start.
//! - After a successful attempt, wait the full `interval` (default 12 h).
//! - After a failed attempt, wait only `retry_backoff` (default 60 s), so a
//!   transient upstream outage does not leave the gateway without a
//!   credential for a whole interval.
//!
//! Failures are logged and never escape the task. The store is never cleared,
//! so a failed refresh keeps serving the previous credential.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; cancellation is honoured both
//! mid-sleep and mid-login.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::credentials::{CredentialStore, ServiceCredential};
use crate::upstream::{IdentityApi, UpstreamError};

/// Default delay after a successful login.
pub const DEFAULT_LOGIN_INTERVAL: Duration = Duration::from_secs(3600 * 12);

/// Default delay after a failed login.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Service account the refresher logs in as.
#[derive(Clone)]
pub struct ServiceAccount {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct LoginRefresher {
    api: Arc<dyn IdentityApi>,
    store: CredentialStore,
    account: ServiceAccount,
    interval: Duration,
    retry_backoff: Duration,
}

impl LoginRefresher {
    pub fn new(api: Arc<dyn IdentityApi>, store: CredentialStore, account: ServiceAccount) -> Self {
        Self {
            api,
            store,
            account,
            interval: DEFAULT_LOGIN_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            username = %self.account.username,
            interval_secs = self.interval.as_secs(),
            retry_secs = self.retry_backoff.as_secs(),
            "Service login refresher starting"
        );

        loop {
            let attempt = tokio::select! {
                result = self.login_once() => result,
                _ = shutdown.cancelled() => {
                    info!("Service login refresher shutting down");
                    return;
                }
            };

            let delay = self.next_delay(&attempt);
            match attempt {
                Ok(credential) => info!(
                    generation = credential.generation(),
                    obtained_at = %credential.obtained_at(),
                    next_login_in_secs = delay.as_secs(),
                    "Service login succeeded"
                ),
                Err(e) => warn!(
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "Service login failed, will retry"
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = shutdown.cancelled() => {
                    info!("Service login refresher shutting down");
                    return;
                }
            }
        }
    }

    /// One login attempt. Returns the credential now in the store.
    async fn login_once(&self) -> Result<ServiceCredential, UpstreamError> {
        let token = self
            .api
            .login(&self.account.username, &self.account.password)
            .await?;
        if token.is_empty() {
            return Err(UpstreamError::EmptyCredential);
        }
        Ok(self.store.set(token))
    }

    fn next_delay<T>(&self, attempt: &Result<T, UpstreamError>) -> Duration {
        match attempt {
            Ok(_) => self.interval,
            Err(_) => self.retry_backoff,
        }
    }
}

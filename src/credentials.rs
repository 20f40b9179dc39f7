// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Credential Store
//!
//! Process-wide holder of the gateway's own upstream credential. The login
//! refresher is the single writer; request handlers and the ingress exchanger
//! are readers.
//!
//! Every `set` replaces the whole [`ServiceCredential`] value under the
//! channel's lock, so a reader always sees one complete credential, never a
//! mix of two. No history is kept.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// A service credential together with the login that produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    token: String,
    generation: u64,
    obtained_at: DateTime<Utc>,
}

impl ServiceCredential {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// 1 for the first successful login, incremented on every refresh.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("token", &"<redacted>")
            .field("generation", &self.generation)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Shared handle to the current service credential.
#[derive(Clone)]
pub struct CredentialStore {
    current: Arc<watch::Sender<Option<ServiceCredential>>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Create an empty store. [`get`](Self::get) returns `None` until the first `set`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            current: Arc::new(tx),
        }
    }

    /// Replace the current credential and return the value now stored.
    pub fn set(&self, token: impl Into<String>) -> ServiceCredential {
        let mut credential = ServiceCredential {
            token: token.into(),
            generation: 1,
            obtained_at: Utc::now(),
        };
        self.current.send_modify(|slot| {
            if let Some(previous) = slot {
                credential.generation = previous.generation + 1;
            }
            *slot = Some(credential.clone());
        });
        credential
    }

    /// Latest credential, or `None` before the first successful login.
    pub fn get(&self) -> Option<ServiceCredential> {
        self.current.borrow().clone()
    }

    /// Latest token string, if any.
    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|c| c.token.clone())
    }

    /// Wait until a credential is present, up to `timeout`.
    ///
    /// Returns `true` once any credential has been set.
    pub async fn wait_until_set(&self, timeout: Duration) -> bool {
        let mut rx = self.current.subscribe();
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await,
            Ok(Ok(_))
        );
        ready
    }
}

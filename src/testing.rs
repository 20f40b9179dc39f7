// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recording fakes for the upstream API and the event broker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::events::{BrokerConnection, BrokerError, BrokerMessage, EventBroker};
use crate::upstream::{IdentityApi, IngressGrant, UpstreamError, VendorSummary};

// ── FakeIdentityApi ──────────────────────────────────────────────────────────

/// Scripted upstream. Login results are consumed in order; once the script
/// runs out every login succeeds with `token-<n>`.
#[derive(Clone, Default)]
pub struct FakeIdentityApi {
    inner: Arc<Mutex<FakeApiState>>,
    login_events: Option<mpsc::UnboundedSender<Instant>>,
}

#[derive(Default)]
struct FakeApiState {
    login_script: VecDeque<Result<String, String>>,
    login_calls: Vec<Instant>,
    verify_result: Option<Result<IngressGrant, String>>,
    verify_calls: Vec<(String, String)>,
    vendors: Vec<VendorSummary>,
    vendor_calls: Vec<String>,
}

impl FakeIdentityApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream login attempt instants to the returned receiver.
    pub fn with_login_events(mut self) -> (Self, mpsc::UnboundedReceiver<Instant>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.login_events = Some(tx);
        (self, rx)
    }

    pub fn push_login(&self, result: Result<&str, &str>) {
        self.inner
            .lock()
            .unwrap()
            .login_script
            .push_back(result.map(str::to_string).map_err(str::to_string));
    }

    pub fn set_verify(&self, result: Result<IngressGrant, &str>) {
        self.inner.lock().unwrap().verify_result = Some(result.map_err(str::to_string));
    }

    pub fn set_vendors(&self, codes: &[&str]) {
        self.inner.lock().unwrap().vendors = codes
            .iter()
            .map(|c| VendorSummary {
                code: (*c).to_string(),
            })
            .collect();
    }

    pub fn login_count(&self) -> usize {
        self.inner.lock().unwrap().login_calls.len()
    }

    /// `(ingress_token, service_credential)` for each verify call.
    pub fn verify_calls(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().verify_calls.clone()
    }

    pub fn vendor_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().vendor_calls.clone()
    }
}

#[async_trait]
impl IdentityApi for FakeIdentityApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<String, UpstreamError> {
        let now = Instant::now();
        let result = {
            let mut state = self.inner.lock().unwrap();
            state.login_calls.push(now);
            let n = state.login_calls.len();
            state
                .login_script
                .pop_front()
                .unwrap_or_else(|| Ok(format!("token-{n}")))
        };
        if let Some(events) = &self.login_events {
            let _ = events.send(now);
        }
        result.map_err(UpstreamError::Request)
    }

    async fn verify_ingress(
        &self,
        ingress_token: &str,
        service_credential: &str,
    ) -> Result<IngressGrant, UpstreamError> {
        let mut state = self.inner.lock().unwrap();
        state
            .verify_calls
            .push((ingress_token.to_string(), service_credential.to_string()));
        match &state.verify_result {
            Some(Ok(grant)) => Ok(grant.clone()),
            Some(Err(msg)) => Err(UpstreamError::Request(msg.clone())),
            None => Err(UpstreamError::Request("no verify result scripted".into())),
        }
    }

    async fn list_active_vendors(
        &self,
        auth_token: &str,
    ) -> Result<Vec<VendorSummary>, UpstreamError> {
        let mut state = self.inner.lock().unwrap();
        state.vendor_calls.push(auth_token.to_string());
        Ok(state.vendors.clone())
    }
}

// ── FakeBroker ───────────────────────────────────────────────────────────────

/// How a fake connection behaves once subscribed.
#[derive(Clone)]
pub enum ListenScript {
    /// Deliver these payloads, then block until cancelled.
    ThenPend(Vec<&'static str>),
    /// Deliver these payloads, then report a lost connection.
    ThenFail(Vec<&'static str>),
}

/// Broker fake recording every lifecycle call in order.
#[derive(Clone)]
pub struct FakeBroker {
    calls: Arc<Mutex<Vec<String>>>,
    connect_failures: Arc<Mutex<u32>>,
    script: ListenScript,
}

impl FakeBroker {
    pub fn new(script: ListenScript) -> Self {
        Self {
            calls: Arc::default(),
            connect_failures: Arc::default(),
            script,
        }
    }

    /// Fail the next `n` connection attempts.
    pub fn failing_connects(self, n: u32) -> Self {
        *self.connect_failures.lock().unwrap() = n;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl EventBroker for FakeBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        self.record("connect");
        {
            let mut failures = self.connect_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(BrokerError::Connect("connection refused".into()));
            }
        }
        let pending = match &self.script {
            ListenScript::ThenPend(p) | ListenScript::ThenFail(p) => p.iter().copied().collect(),
        };
        Ok(Box::new(FakeConnection {
            broker: self.clone(),
            pending,
            fail_after: matches!(self.script, ListenScript::ThenFail(_)),
        }))
    }
}

struct FakeConnection {
    broker: FakeBroker,
    pending: VecDeque<&'static str>,
    fail_after: bool,
}

#[async_trait]
impl BrokerConnection for FakeConnection {
    async fn subscribe(&mut self, channel: &str) -> Result<(), BrokerError> {
        self.broker.record(format!("subscribe:{channel}"));
        Ok(())
    }

    async fn next_message(&mut self) -> Result<BrokerMessage, BrokerError> {
        if let Some(payload) = self.pending.pop_front() {
            return Ok(BrokerMessage {
                channel: "fake".into(),
                payload: payload.as_bytes().to_vec().into(),
            });
        }
        if self.fail_after {
            return Err(BrokerError::Disconnected("stream ended".into()));
        }
        std::future::pending().await
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), BrokerError> {
        self.broker.record(format!("unsubscribe:{channel}"));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.broker.record("close");
        Ok(())
    }
}

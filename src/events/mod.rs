// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Workflow Event Subscriber
//!
//! Background task holding a subscription to the platform's workflow event
//! channel for the lifetime of the process.
//!
//! ## Lifecycle
//!
//! ```text
//! Connecting ──► Subscribed ──► Listening ──► Unsubscribing ──► Closed
//!      │                                                          ▲
//!      └──────────────────── connect failure ─────────────────────┘
//! ```
//!
//! Whatever ends the listen loop (shutdown, stream end, receive error), the
//! subscription is torn down in order: `unsubscribe`, then `close`, exactly
//! once per connection.
//!
//! ## Reconnection
//!
//! A broker failure is followed by up to `reconnect_attempts` consecutive
//! reconnects, `RECONNECT_BACKOFF` apart. A session that delivered at least
//! one message resets the count. Once the budget is spent the task stops;
//! HTTP traffic is unaffected.
//!
//! ## Backends
//!
//! Redis pub/sub when `REDIS_URL` is configured, NATS otherwise. See
//! [`broker_for`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BrokerConfig, BrokerKind};

mod nats;
mod redis_pubsub;

pub use self::nats::NatsBroker;
pub use self::redis_pubsub::RedisBroker;

/// Delay between reconnect attempts.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes of payload echoed at debug level.
const PREVIEW_BYTES: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("broker subscribe failed: {0}")]
    Subscribe(String),

    #[error("broker connection lost: {0}")]
    Disconnected(String),

    #[error("broker unsubscribe failed: {0}")]
    Unsubscribe(String),

    #[error("broker close failed: {0}")]
    Close(String),
}

#[derive(Debug, Clone)]
pub struct BrokerMessage {
    pub channel: String,
    pub payload: Bytes,
}

/// Opens connections to the event broker.
#[async_trait]
pub trait EventBroker: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError>;
}

/// Broker backend selected by the configuration.
pub fn broker_for(config: &BrokerConfig) -> Arc<dyn EventBroker> {
    match config.kind {
        BrokerKind::Redis => Arc::new(RedisBroker::new(config.clone())),
        BrokerKind::Nats => Arc::new(NatsBroker::new(config.clone())),
    }
}

/// One live broker connection carrying at most one subscription.
#[async_trait]
pub trait BrokerConnection: Send {
    async fn subscribe(&mut self, channel: &str) -> Result<(), BrokerError>;

    /// Wait for the next message. An error means the subscription is gone.
    async fn next_message(&mut self) -> Result<BrokerMessage, BrokerError>;

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), BrokerError>;

    /// Release the connection. Called once, after `unsubscribe`.
    async fn close(&mut self) -> Result<(), BrokerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Subscribed,
    Listening,
    Unsubscribing,
    Closed,
}

enum SessionExit {
    Cancelled,
    /// `healthy` when the session delivered at least one message.
    Failed { error: BrokerError, healthy: bool },
}

/// Long-running subscriber for the workflow events channel.
pub struct EventSubscriber {
    broker: Arc<dyn EventBroker>,
    channel: String,
    reconnect_attempts: u32,
    reconnect_backoff: Duration,
    received: Arc<AtomicU64>,
    state: watch::Sender<SubscriberState>,
}

impl EventSubscriber {
    pub fn new(broker: Arc<dyn EventBroker>, channel: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SubscriberState::Closed);
        Self {
            broker,
            channel: channel.into(),
            reconnect_attempts: 0,
            reconnect_backoff: RECONNECT_BACKOFF,
            received: Arc::new(AtomicU64::new(0)),
            state,
        }
    }

    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    #[cfg(test)]
    fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Running count of messages received.
    pub fn received_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.received)
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    /// Run the subscriber until cancelled or out of reconnect attempts.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(subscriber.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            channel = %self.channel,
            reconnect_attempts = self.reconnect_attempts,
            "Workflow event subscriber starting"
        );

        let mut failures: u32 = 0;
        loop {
            match self.session(&shutdown).await {
                SessionExit::Cancelled => {
                    info!(channel = %self.channel, "Workflow event subscriber shutting down");
                    return;
                }
                SessionExit::Failed { error, healthy } => {
                    failures = if healthy { 1 } else { failures + 1 };
                    if failures > self.reconnect_attempts {
                        error!(
                            channel = %self.channel,
                            error = %error,
                            attempts = failures,
                            "Workflow event subscriber giving up"
                        );
                        return;
                    }
                    warn!(
                        channel = %self.channel,
                        error = %error,
                        attempt = failures,
                        max_attempts = self.reconnect_attempts,
                        retry_in_secs = self.reconnect_backoff.as_secs(),
                        "Workflow event subscription lost, reconnecting"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_backoff) => {},
                _ = shutdown.cancelled() => {
                    info!(channel = %self.channel, "Workflow event subscriber shutting down");
                    return;
                }
            }
        }
    }

    /// One connection's lifetime, including its teardown.
    async fn session(&self, shutdown: &CancellationToken) -> SessionExit {
        self.transition(SubscriberState::Connecting);
        let connected = tokio::select! {
            result = self.broker.connect() => result,
            _ = shutdown.cancelled() => {
                self.transition(SubscriberState::Closed);
                return SessionExit::Cancelled;
            }
        };

        let mut conn = match connected {
            Ok(conn) => conn,
            Err(error) => {
                self.transition(SubscriberState::Closed);
                return SessionExit::Failed {
                    error,
                    healthy: false,
                };
            }
        };

        if let Err(error) = conn.subscribe(&self.channel).await {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Failed to close broker connection");
            }
            self.transition(SubscriberState::Closed);
            return SessionExit::Failed {
                error,
                healthy: false,
            };
        }
        self.transition(SubscriberState::Subscribed);
        info!(channel = %self.channel, "Subscribed to workflow events");

        let exit = self.listen(conn.as_mut(), shutdown).await;

        self.transition(SubscriberState::Unsubscribing);
        match conn.unsubscribe(&self.channel).await {
            Ok(()) => info!(channel = %self.channel, "Unsubscribed from workflow events"),
            Err(e) => warn!(channel = %self.channel, error = %e, "Failed to unsubscribe"),
        }
        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close broker connection");
        }
        self.transition(SubscriberState::Closed);

        exit
    }

    async fn listen(
        &self,
        conn: &mut dyn BrokerConnection,
        shutdown: &CancellationToken,
    ) -> SessionExit {
        self.transition(SubscriberState::Listening);
        let mut delivered = false;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionExit::Cancelled,
                received = conn.next_message() => match received {
                    Ok(message) => {
                        delivered = true;
                        self.handle(message);
                    }
                    Err(error) => {
                        return SessionExit::Failed { error, healthy: delivered };
                    }
                },
            }
        }
    }

    fn handle(&self, message: BrokerMessage) {
        let count = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            channel = %message.channel,
            bytes = message.payload.len(),
            total = count,
            "Received workflow event"
        );
        let preview_len = message.payload.len().min(PREVIEW_BYTES);
        debug!(
            preview = %String::from_utf8_lossy(&message.payload[..preview_len]),
            "Workflow event payload"
        );
    }

    fn transition(&self, next: SubscriberState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Event subscriber state change");
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NATS core subscription backend.

use std::time::Duration;

use async_nats::ConnectOptions;
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::info;

use super::{BrokerConnection, BrokerError, BrokerMessage, EventBroker, CONNECT_TIMEOUT};
use crate::config::BrokerConfig;

/// Keep-alive ping interval on the broker connection.
const PING_INTERVAL: Duration = Duration::from_secs(120);

/// NATS-backed broker.
pub struct NatsBroker {
    config: BrokerConfig,
}

impl NatsBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EventBroker for NatsBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        info!(url = %self.config.url, "Connecting to NATS event broker");

        let mut options = ConnectOptions::new()
            .name("enclave-gateway")
            .ping_interval(PING_INTERVAL)
            .connection_timeout(CONNECT_TIMEOUT);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(self.config.url.as_str())
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        info!(url = %self.config.url, "Connected to NATS event broker");
        Ok(Box::new(NatsConnection::new(client)))
    }
}

struct NatsConnection {
    /// `None` once closed.
    client: Option<async_nats::Client>,
    subscriber: Option<async_nats::Subscriber>,
}

impl NatsConnection {
    fn new(client: async_nats::Client) -> Self {
        Self {
            client: Some(client),
            subscriber: None,
        }
    }
}

#[async_trait]
impl BrokerConnection for NatsConnection {
    async fn subscribe(&mut self, channel: &str) -> Result<(), BrokerError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| BrokerError::Subscribe("connection closed".into()))?;
        let subscriber = client
            .subscribe(channel.to_string())
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        self.subscriber = Some(subscriber);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<BrokerMessage, BrokerError> {
        let subscriber = self
            .subscriber
            .as_mut()
            .ok_or_else(|| BrokerError::Disconnected("not subscribed".into()))?;

        match subscriber.next().await {
            Some(message) => Ok(BrokerMessage {
                channel: message.subject.to_string(),
                payload: message.payload,
            }),
            None => Err(BrokerError::Disconnected(
                "subscription stream closed".into(),
            )),
        }
    }

    async fn unsubscribe(&mut self, _channel: &str) -> Result<(), BrokerError> {
        if let Some(mut subscriber) = self.subscriber.take() {
            subscriber
                .unsubscribe()
                .await
                .map_err(|e| BrokerError::Unsubscribe(e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        // Drain flushes pending commands and closes the socket, even if other
        // handles to this client are still alive.
        match self.client.take() {
            Some(client) => client
                .drain()
                .await
                .map_err(|e| BrokerError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}

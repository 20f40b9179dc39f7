// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process lifecycle: start the background tasks, serve HTTP until a
//! shutdown signal, then stop the tasks within the configured deadline.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::router;
use crate::config::GatewayConfig;
use crate::credentials::CredentialStore;
use crate::events::{broker_for, EventSubscriber};
use crate::refresher::{LoginRefresher, ServiceAccount};
use crate::state::AppState;
use crate::tasks::Supervisor;
use crate::upstream::{HttpIdentityApi, IdentityApi, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), ServerError> {
    info!(
        enclave = %config.enclave_name,
        mode = %config.mode,
        upstream = %config.api_base_url,
        broker = %config.broker.kind,
        "Starting enclave gateway"
    );

    let api: Arc<dyn IdentityApi> = Arc::new(HttpIdentityApi::new(config.api_base_url.clone())?);
    let credentials = CredentialStore::new();

    let mut supervisor = Supervisor::new();
    spawn_login_refresher(&mut supervisor, &config, Arc::clone(&api), credentials.clone());
    spawn_event_subscriber(&mut supervisor, &config);

    if credentials.wait_until_set(config.first_login_wait).await {
        info!("Service credential available");
    } else {
        warn!(
            waited_secs = config.first_login_wait.as_secs(),
            "No service credential yet, serving anyway"
        );
    }

    let shutdown_timeout = config.shutdown_timeout;
    let bind_addr = config.bind_addr;
    let state = AppState::new(config, api, credentials);

    let served = serve(bind_addr, state).await;

    let aborted = supervisor.shutdown(shutdown_timeout).await;
    if !aborted.is_empty() {
        warn!(tasks = ?aborted, "Background tasks aborted at shutdown");
    }
    info!("Enclave gateway stopped");
    served
}

async fn serve(addr: std::net::SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(
        addr = %addr,
        ui = %state.config.ui_path(),
        "Enclave gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

fn spawn_login_refresher(
    supervisor: &mut Supervisor,
    config: &GatewayConfig,
    api: Arc<dyn IdentityApi>,
    store: CredentialStore,
) {
    let account = ServiceAccount {
        username: config.service_username.clone(),
        password: config.service_password.clone(),
    };
    let interval = config.login_interval;
    let retry = config.login_retry;

    supervisor.spawn_supervised("login-refresher", move |shutdown| {
        LoginRefresher::new(Arc::clone(&api), store.clone(), account.clone())
            .with_interval(interval)
            .with_retry_backoff(retry)
            .run(shutdown)
    });
}

fn spawn_event_subscriber(supervisor: &mut Supervisor, config: &GatewayConfig) {
    let broker = broker_for(&config.broker);
    let channel = config.broker.channel.clone();
    let attempts = config.broker.reconnect_attempts;

    supervisor.spawn_supervised("event-subscriber", move |shutdown| {
        EventSubscriber::new(Arc::clone(&broker), channel.clone())
            .with_reconnect_attempts(attempts)
            .run(shutdown)
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Background Task Supervisor
//!
//! Owns the shutdown [`CancellationToken`] shared by every long-lived task and
//! the join handles needed to wait for them.
//!
//! - A task that panics is logged and started again after [`RESTART_DELAY`],
//!   unless shutdown has begun.
//! - A task that returns normally stays stopped.
//! - [`Supervisor::shutdown`] cancels the token and waits for every task up to
//!   a deadline; whatever is still running then is aborted and reported.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delay before a panicked task is started again.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

pub struct Supervisor {
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Spawn `factory()` and keep it running across panics.
    ///
    /// ```rust,ignore
    /// supervisor.spawn_supervised("login-refresher", move |shutdown| {
    ///     build_refresher().run(shutdown)
    /// });
    /// ```
    pub fn spawn_supervised<F, Fut>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut restarts: u32 = 0;
            loop {
                let mut run = AbortOnDrop(tokio::spawn(factory(shutdown.clone())));
                match (&mut run.0).await {
                    Ok(()) => {
                        info!(task = name, "Background task finished");
                        return;
                    }
                    Err(e) if e.is_panic() => {
                        restarts += 1;
                        error!(task = name, restarts, "Background task panicked");
                    }
                    Err(_) => {
                        warn!(task = name, "Background task was cancelled");
                        return;
                    }
                }

                if shutdown.is_cancelled() {
                    return;
                }
                tokio::select! {
                    _ = tokio::time::sleep(RESTART_DELAY) => {
                        info!(task = name, "Restarting background task");
                    }
                    _ = shutdown.cancelled() => return,
                }
            }
        });
        self.tasks.push((name, handle));
    }

    /// Cancel every task and wait up to `timeout` for them to stop.
    ///
    /// Returns the names of tasks that had to be aborted.
    pub async fn shutdown(self, timeout: Duration) -> Vec<&'static str> {
        info!(tasks = self.tasks.len(), "Stopping background tasks");
        self.shutdown.cancel();

        let deadline = tokio::time::Instant::now() + timeout;
        let mut aborted = Vec::new();
        for (name, mut handle) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(_) => info!(task = name, "Background task stopped"),
                Err(_) => {
                    handle.abort();
                    warn!(
                        task = name,
                        timeout_secs = timeout.as_secs(),
                        "Background task did not stop in time, aborted"
                    );
                    aborted.push(name);
                }
            }
        }
        aborted
    }
}

/// Aborts the wrapped task when dropped, so aborting a supervisor loop also
/// stops the task it is watching.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

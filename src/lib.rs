// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enclave Gateway - edge gateway for a single enclave SPA
//!
//! The gateway keeps its own service credential fresh against the platform
//! API, turns single-use ingress tokens into encrypted session cookies, serves
//! the enclave's SPA, and holds a subscription to the workflow event bus.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and router (Axum)
//! - `credentials` - shared service credential store
//! - `refresher` - background service login loop
//! - `session` - encrypted session cookie codec
//! - `ingress` - ingress token exchange
//! - `events` - workflow event subscriber (Redis or NATS)
//! - `tasks` - background task supervision

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod index_page;
pub mod ingress;
pub mod refresher;
pub mod server;
pub mod session;
pub mod state;
pub mod tasks;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod testing;

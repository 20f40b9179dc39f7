// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use enclave_gateway::config::GatewayConfig;
use enclave_gateway::server;
use enclave_gateway::telemetry::{self, LogFormat};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();
    telemetry::init(LogFormat::from_env());

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load environment file"),
    }

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            for problem in &e.problems {
                error!(%problem, "Invalid configuration");
            }
            error!("{e}, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    match server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Enclave gateway failed");
            ExitCode::FAILURE
        }
    }
}

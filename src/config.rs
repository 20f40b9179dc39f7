// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup (after an
//! optional `.env` file has been loaded). Every problem is collected so the
//! operator sees the full list in one run; any problem aborts startup before
//! the listener is bound.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCLAVE_NAME` | Enclave identifier, prefixes every route | Required |
//! | `API_BASE_URL` (or `SCAILO_API`) | Upstream identity API base URL | Required |
//! | `SERVICE_USERNAME` (or `USERNAME`) | Service account username | Required |
//! | `SERVICE_PASSWORD` (or `PASSWORD`) | Service account password | Required |
//! | `REDIS_URL` | Redis broker, `host:port` or `redis://` URL | One broker required |
//! | `REDIS_USERNAME` / `REDIS_PASSWORD` | Redis credentials | Optional |
//! | `NATS_URL` | NATS broker URL, used when `REDIS_URL` is unset | One broker required |
//! | `NATS_USERNAME` / `NATS_PASSWORD` | NATS credentials | Optional |
//! | `WORKFLOW_EVENTS_CHANNEL` | Broker channel to subscribe to | Required |
//! | `COOKIE_SIGNATURE_SECRET` | Secret the session cookie key is derived from | Required |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PRODUCTION` | `true` enables ingress verification and index caching | `false` |
//! | `LOGIN_INTERVAL_SECS` | Delay after a successful service login | `43200` |
//! | `LOGIN_RETRY_SECS` | Delay after a failed service login | `60` |
//! | `FIRST_LOGIN_WAIT_SECS` | How long startup waits for the first login | `10` |
//! | `SHUTDOWN_TIMEOUT_SECS` | Bound on background task shutdown | `10` |
//! | `BROKER_RECONNECT_ATTEMPTS` | Consecutive broker reconnects before giving up | `3` |
//! | `INDEX_HTML_PATH` | SPA index document | `index.html` |
//! | `RESOURCES_DIR` | Static bundle directory | `resources/dist` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! The names in parentheses are accepted when the primary name is unset, so
//! existing deployment manifests keep working.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::session::CookieCipherKey;

pub const ENCLAVE_NAME_ENV: &str = "ENCLAVE_NAME";
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const SERVICE_USERNAME_ENV: &str = "SERVICE_USERNAME";
pub const SERVICE_PASSWORD_ENV: &str = "SERVICE_PASSWORD";
pub const SCAILO_API_ENV: &str = "SCAILO_API";
pub const USERNAME_ENV: &str = "USERNAME";
pub const PASSWORD_ENV: &str = "PASSWORD";
pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const REDIS_USERNAME_ENV: &str = "REDIS_USERNAME";
pub const REDIS_PASSWORD_ENV: &str = "REDIS_PASSWORD";
pub const NATS_URL_ENV: &str = "NATS_URL";
pub const NATS_USERNAME_ENV: &str = "NATS_USERNAME";
pub const NATS_PASSWORD_ENV: &str = "NATS_PASSWORD";
pub const WORKFLOW_EVENTS_CHANNEL_ENV: &str = "WORKFLOW_EVENTS_CHANNEL";
pub const COOKIE_SIGNATURE_SECRET_ENV: &str = "COOKIE_SIGNATURE_SECRET";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PRODUCTION_ENV: &str = "PRODUCTION";
pub const LOGIN_INTERVAL_SECS_ENV: &str = "LOGIN_INTERVAL_SECS";
pub const LOGIN_RETRY_SECS_ENV: &str = "LOGIN_RETRY_SECS";
pub const FIRST_LOGIN_WAIT_SECS_ENV: &str = "FIRST_LOGIN_WAIT_SECS";
pub const SHUTDOWN_TIMEOUT_SECS_ENV: &str = "SHUTDOWN_TIMEOUT_SECS";
pub const BROKER_RECONNECT_ATTEMPTS_ENV: &str = "BROKER_RECONNECT_ATTEMPTS";
pub const INDEX_HTML_PATH_ENV: &str = "INDEX_HTML_PATH";
pub const RESOURCES_DIR_ENV: &str = "RESOURCES_DIR";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOGIN_INTERVAL: Duration = Duration::from_secs(3600 * 12);
const DEFAULT_LOGIN_RETRY: Duration = Duration::from_secs(60);
const DEFAULT_FIRST_LOGIN_WAIT: Duration = Duration::from_secs(10);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BROKER_RECONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_INDEX_HTML_PATH: &str = "index.html";
const DEFAULT_RESOURCES_DIR: &str = "resources/dist";

/// Whether the gateway runs against the real ingress verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Ingress tokens are verified upstream; the index document is cached.
    Production,
    /// Ingress hands out the service credential; the index is re-read per request.
    Development,
}

impl RuntimeMode {
    pub fn is_production(self) -> bool {
        matches!(self, RuntimeMode::Production)
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Production => write!(f, "production"),
            RuntimeMode::Development => write!(f, "development"),
        }
    }
}

/// Event bus backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    Redis,
    Nats,
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerKind::Redis => write!(f, "redis"),
            BrokerKind::Nats => write!(f, "nats"),
        }
    }
}

/// Broker connection settings.
#[derive(Clone)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    /// Broker URL without credentials.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub channel: String,
    pub reconnect_attempts: u32,
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("channel", &self.channel)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .finish()
    }
}

/// Fully validated gateway configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    pub enclave_name: String,
    pub api_base_url: Url,
    pub service_username: String,
    pub service_password: String,
    pub broker: BrokerConfig,
    pub cookie_key: CookieCipherKey,
    pub bind_addr: SocketAddr,
    pub mode: RuntimeMode,
    pub login_interval: Duration,
    pub login_retry: Duration,
    pub first_login_wait: Duration,
    pub shutdown_timeout: Duration,
    pub index_html_path: PathBuf,
    pub resources_dir: PathBuf,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("enclave_name", &self.enclave_name)
            .field("api_base_url", &self.api_base_url.as_str())
            .field("service_username", &self.service_username)
            .field("broker", &self.broker)
            .field("bind_addr", &self.bind_addr)
            .field("mode", &self.mode)
            .field("login_interval", &self.login_interval)
            .field("login_retry", &self.login_retry)
            .finish_non_exhaustive()
    }
}

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    Missing(&'static str),
    /// None of several alternatives is set.
    MissingOneOf(&'static [&'static str]),
    Invalid { name: &'static str, reason: String },
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigProblem::Missing(name) => write!(f, "{name} not set"),
            ConfigProblem::MissingOneOf(names) => {
                write!(f, "one of {} must be set", names.join(", "))
            }
            ConfigProblem::Invalid { name, reason } => write!(f, "{name} is invalid: {reason}"),
        }
    }
}

/// Startup configuration failure, listing every problem found.
#[derive(Debug, thiserror::Error)]
#[error("{} configuration problem(s) found", .problems.len())]
pub struct ConfigError {
    pub problems: Vec<ConfigProblem>,
}

impl ConfigError {
    pub fn is_missing(&self, name: &str) -> bool {
        self.problems
            .iter()
            .any(|p| match p {
                ConfigProblem::Missing(n) => *n == name,
                ConfigProblem::MissingOneOf(names) => names.contains(&name),
                ConfigProblem::Invalid { .. } => false,
            })
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader {
            lookup,
            problems: Vec::new(),
        };

        let enclave_name = reader.required(ENCLAVE_NAME_ENV);
        if let Some(name) = &enclave_name {
            if !is_valid_enclave_name(name) {
                reader.invalid(
                    ENCLAVE_NAME_ENV,
                    "only ASCII letters, digits, '-' and '_' are allowed",
                );
            }
        }

        let api_base_url = reader
            .required_or(API_BASE_URL_ENV, SCAILO_API_ENV)
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(_) => {
                    reader.invalid(API_BASE_URL_ENV, "scheme must be http or https");
                    None
                }
                Err(e) => {
                    reader.invalid(API_BASE_URL_ENV, e.to_string());
                    None
                }
            });

        let service_username = reader.required_or(SERVICE_USERNAME_ENV, USERNAME_ENV);
        let service_password = reader.required_or(SERVICE_PASSWORD_ENV, PASSWORD_ENV);
        let broker_endpoint = match (reader.optional(REDIS_URL_ENV), reader.optional(NATS_URL_ENV)) {
            (Some(raw), _) => match redis_url(&raw) {
                Ok(url) => Some((BrokerKind::Redis, url)),
                Err(reason) => {
                    reader.invalid(REDIS_URL_ENV, reason);
                    None
                }
            },
            (None, Some(url)) => Some((BrokerKind::Nats, url)),
            (None, None) => {
                reader
                    .problems
                    .push(ConfigProblem::MissingOneOf(&[REDIS_URL_ENV, NATS_URL_ENV]));
                None
            }
        };
        let channel = reader.required(WORKFLOW_EVENTS_CHANNEL_ENV);
        let cookie_secret = reader.required(COOKIE_SIGNATURE_SECRET_ENV);

        let host = reader
            .optional(HOST_ENV)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: Option<IpAddr> = match host.parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                reader.invalid(HOST_ENV, format!("'{host}' is not an IP address"));
                None
            }
        };
        let port = reader.parsed::<u16>(PORT_ENV).unwrap_or(DEFAULT_PORT);
        if port == 0 {
            reader.invalid(PORT_ENV, "must be between 1 and 65535");
        }

        let mode = match reader.optional(PRODUCTION_ENV) {
            Some(v) if v.eq_ignore_ascii_case("true") => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        };

        let login_interval = reader
            .seconds(LOGIN_INTERVAL_SECS_ENV)
            .unwrap_or(DEFAULT_LOGIN_INTERVAL);
        let login_retry = reader
            .seconds(LOGIN_RETRY_SECS_ENV)
            .unwrap_or(DEFAULT_LOGIN_RETRY);
        let first_login_wait = reader
            .seconds(FIRST_LOGIN_WAIT_SECS_ENV)
            .unwrap_or(DEFAULT_FIRST_LOGIN_WAIT);
        let shutdown_timeout = reader
            .seconds(SHUTDOWN_TIMEOUT_SECS_ENV)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        let reconnect_attempts = reader
            .parsed::<u32>(BROKER_RECONNECT_ATTEMPTS_ENV)
            .unwrap_or(DEFAULT_BROKER_RECONNECT_ATTEMPTS);

        let index_html_path = reader
            .optional(INDEX_HTML_PATH_ENV)
            .unwrap_or_else(|| DEFAULT_INDEX_HTML_PATH.to_string());
        let resources_dir = reader
            .optional(RESOURCES_DIR_ENV)
            .unwrap_or_else(|| DEFAULT_RESOURCES_DIR.to_string());

        let (username_env, password_env) = match &broker_endpoint {
            Some((BrokerKind::Nats, _)) => (NATS_USERNAME_ENV, NATS_PASSWORD_ENV),
            _ => (REDIS_USERNAME_ENV, REDIS_PASSWORD_ENV),
        };
        let broker_username = reader.optional(username_env);
        let broker_password = reader.optional(password_env);

        let Reader { problems, .. } = reader;

        match (
            enclave_name,
            api_base_url,
            service_username,
            service_password,
            broker_endpoint,
            channel,
            cookie_secret,
            host,
        ) {
            (
                Some(enclave_name),
                Some(api_base_url),
                Some(service_username),
                Some(service_password),
                Some((kind, url)),
                Some(channel),
                Some(cookie_secret),
                Some(host),
            ) if problems.is_empty() => Ok(Self {
                enclave_name,
                api_base_url,
                service_username,
                service_password,
                broker: BrokerConfig {
                    kind,
                    url,
                    username: broker_username,
                    password: broker_password,
                    channel,
                    reconnect_attempts,
                },
                cookie_key: CookieCipherKey::from_secret(&cookie_secret),
                bind_addr: SocketAddr::new(host, port),
                mode,
                login_interval,
                login_retry,
                first_login_wait,
                shutdown_timeout,
                index_html_path: PathBuf::from(index_html_path),
                resources_dir: PathBuf::from(resources_dir),
            }),
            _ => Err(ConfigError { problems }),
        }
    }

    /// Route prefix shared by every enclave route, e.g. `/enclave/acme`.
    pub fn enclave_prefix(&self) -> String {
        enclave_prefix(&self.enclave_name)
    }

    /// Landing path every redirect points at.
    pub fn ui_path(&self) -> String {
        format!("{}/ui", self.enclave_prefix())
    }

    /// Name of the session cookie and of the session key inside it.
    pub fn session_key(&self) -> String {
        format!("{}_auth_token", self.enclave_name)
    }
}

pub fn enclave_prefix(enclave_name: &str) -> String {
    format!("/enclave/{enclave_name}")
}

/// Normalise `REDIS_URL`. A bare `host:port` becomes `redis://host:port`.
fn redis_url(raw: &str) -> Result<String, String> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("redis://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "redis" | "rediss") {
        return Err("scheme must be redis or rediss".into());
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".into());
    }
    Ok(candidate)
}

fn is_valid_enclave_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

struct Reader<F> {
    lookup: F,
    problems: Vec<ConfigProblem>,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &'static str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, name: &'static str) -> Option<String> {
        let value = self.optional(name);
        if value.is_none() {
            self.problems.push(ConfigProblem::Missing(name));
        }
        value
    }

    /// Like [`required`](Self::required), falling back to `alias`. A miss
    /// is reported under the primary name.
    fn required_or(&mut self, name: &'static str, alias: &'static str) -> Option<String> {
        let value = self.optional(name).or_else(|| self.optional(alias));
        if value.is_none() {
            self.problems.push(ConfigProblem::Missing(name));
        }
        value
    }

    fn parsed<T>(&mut self, name: &'static str) -> Option<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.optional(name)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.invalid(name, format!("'{raw}': {e}"));
                None
            }
        }
    }

    fn seconds(&mut self, name: &'static str) -> Option<Duration> {
        self.parsed::<u64>(name).map(Duration::from_secs)
    }

    fn invalid(&mut self, name: &'static str, reason: impl Into<String>) {
        self.problems.push(ConfigProblem::Invalid {
            name,
            reason: reason.into(),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENCLAVE_NAME_ENV, "acme".to_string()),
            (API_BASE_URL_ENV, "https://api.example.com".to_string()),
            (SERVICE_USERNAME_ENV, "svc".to_string()),
            (SERVICE_PASSWORD_ENV, "hunter2".to_string()),
            (NATS_URL_ENV, "nats://localhost:4222".to_string()),
            (WORKFLOW_EVENTS_CHANNEL_ENV, "workflow.events".to_string()),
            (COOKIE_SIGNATURE_SECRET_ENV, "cookie-secret".to_string()),
        ])
    }

    pub(crate) fn config_from(env: &HashMap<&'static str, String>) -> Result<GatewayConfig, ConfigError> {
        GatewayConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn loads_required_values_with_defaults() {
        let config = config_from(&base_env()).expect("valid config");
        assert_eq!(config.enclave_name, "acme");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.mode, RuntimeMode::Development);
        assert_eq!(config.login_interval, Duration::from_secs(43_200));
        assert_eq!(config.login_retry, Duration::from_secs(60));
        assert_eq!(config.broker.reconnect_attempts, 3);
        assert_eq!(config.enclave_prefix(), "/enclave/acme");
        assert_eq!(config.ui_path(), "/enclave/acme/ui");
        assert_eq!(config.session_key(), "acme_auth_token");
    }

    #[test]
    fn collects_every_missing_variable() {
        let err = config_from(&HashMap::new()).expect_err("empty env must fail");
        for name in [
            ENCLAVE_NAME_ENV,
            API_BASE_URL_ENV,
            SERVICE_USERNAME_ENV,
            SERVICE_PASSWORD_ENV,
            REDIS_URL_ENV,
            NATS_URL_ENV,
            WORKFLOW_EVENTS_CHANNEL_ENV,
            COOKIE_SIGNATURE_SECRET_ENV,
        ] {
            assert!(err.is_missing(name), "{name} should be reported");
        }
        assert_eq!(err.problems.len(), 7);
        assert!(err
            .problems
            .iter()
            .any(|p| p.to_string() == "one of REDIS_URL, NATS_URL must be set"));
    }

    #[test]
    fn nats_is_used_without_redis_url() {
        let config = config_from(&base_env()).unwrap();
        assert_eq!(config.broker.kind, BrokerKind::Nats);
        assert_eq!(config.broker.url, "nats://localhost:4222");
    }

    #[test]
    fn redis_url_selects_redis_and_its_credentials() {
        let mut env = base_env();
        env.insert(REDIS_URL_ENV, "redis-master:6379".to_string());
        env.insert(REDIS_USERNAME_ENV, "gateway".to_string());
        env.insert(REDIS_PASSWORD_ENV, "redis-pass".to_string());
        env.insert(NATS_PASSWORD_ENV, "nats-pass".to_string());

        let config = config_from(&env).unwrap();
        assert_eq!(config.broker.kind, BrokerKind::Redis);
        assert_eq!(config.broker.url, "redis://redis-master:6379");
        assert_eq!(config.broker.username.as_deref(), Some("gateway"));
        assert_eq!(config.broker.password.as_deref(), Some("redis-pass"));
        assert!(!format!("{:?}", config.broker).contains("redis-pass"));
    }

    #[test]
    fn redis_url_accepts_full_urls_and_rejects_other_schemes() {
        let mut env = base_env();
        env.insert(REDIS_URL_ENV, "rediss://cache.internal:6380/2".to_string());
        assert_eq!(
            config_from(&env).unwrap().broker.url,
            "rediss://cache.internal:6380/2"
        );

        env.insert(REDIS_URL_ENV, "http://cache.internal:6379".to_string());
        let err = config_from(&env).expect_err("wrong scheme must fail");
        assert!(matches!(
            err.problems.as_slice(),
            [ConfigProblem::Invalid { name: REDIS_URL_ENV, .. }]
        ));
    }

    #[test]
    fn original_variable_names_are_accepted_as_fallbacks() {
        let mut env = base_env();
        env.remove(API_BASE_URL_ENV);
        env.remove(SERVICE_USERNAME_ENV);
        env.remove(SERVICE_PASSWORD_ENV);
        env.insert(SCAILO_API_ENV, "https://legacy.example.com".to_string());
        env.insert(USERNAME_ENV, "legacy-svc".to_string());
        env.insert(PASSWORD_ENV, "legacy-pass".to_string());

        let config = config_from(&env).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://legacy.example.com/");
        assert_eq!(config.service_username, "legacy-svc");
        assert_eq!(config.service_password, "legacy-pass");
    }

    #[test]
    fn primary_names_win_over_fallbacks() {
        let mut env = base_env();
        env.insert(USERNAME_ENV, "shell-user".to_string());
        env.insert(SCAILO_API_ENV, "https://legacy.example.com".to_string());

        let config = config_from(&env).unwrap();
        assert_eq!(config.service_username, "svc");
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn missing_enclave_name_is_reported_alone() {
        let mut env = base_env();
        env.remove(ENCLAVE_NAME_ENV);
        let err = config_from(&env).expect_err("missing enclave must fail");
        assert_eq!(err.problems, vec![ConfigProblem::Missing(ENCLAVE_NAME_ENV)]);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut env = base_env();
        env.insert(COOKIE_SIGNATURE_SECRET_ENV, "   ".to_string());
        let err = config_from(&env).expect_err("blank secret must fail");
        assert!(err.is_missing(COOKIE_SIGNATURE_SECRET_ENV));
    }

    #[test]
    fn rejects_bad_port_and_url() {
        let mut env = base_env();
        env.insert(PORT_ENV, "0".to_string());
        env.insert(API_BASE_URL_ENV, "ftp://api.example.com".to_string());
        let err = config_from(&env).expect_err("invalid values must fail");
        assert_eq!(err.problems.len(), 2);

        let mut env = base_env();
        env.insert(PORT_ENV, "eighty".to_string());
        assert!(config_from(&env).is_err());
    }

    #[test]
    fn rejects_enclave_names_that_break_routes() {
        let mut env = base_env();
        env.insert(ENCLAVE_NAME_ENV, "acme/ui".to_string());
        assert!(config_from(&env).is_err());
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let mut env = base_env();
        env.insert(PRODUCTION_ENV, "TRUE".to_string());
        assert_eq!(config_from(&env).unwrap().mode, RuntimeMode::Production);

        env.insert(PRODUCTION_ENV, "yes".to_string());
        assert_eq!(config_from(&env).unwrap().mode, RuntimeMode::Development);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut env = base_env();
        env.insert(NATS_PASSWORD_ENV, "broker-pass".to_string());
        let rendered = format!("{:?}", config_from(&env).unwrap());
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("broker-pass"));
        assert!(!rendered.contains("cookie-secret"));
    }
}

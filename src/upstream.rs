// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upstream identity API client.
//!
//! The platform API speaks JSON over HTTP(S) with RPC-style paths. Only the
//! fields the gateway consumes are modelled; everything else in the responses
//! is ignored.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use url::Url;

const LOGIN_PATH: &str = "Scailo.LoginService/LoginAsEmployeePrimary";
const VERIFY_INGRESS_PATH: &str = "Scailo.VaultService/VerifyEnclaveIngress";
const VENDORS_FILTER_PATH: &str = "Scailo.VendorsService/Filter";

/// Header carrying the caller's credential on authenticated calls.
pub const AUTH_TOKEN_HEADER: &str = "auth_token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream response was invalid: {0}")]
    InvalidResponse(String),

    #[error("upstream returned an empty credential")]
    EmptyCredential,
}

/// Result of a successful ingress verification.
#[derive(Clone, PartialEq, Eq)]
pub struct IngressGrant {
    /// Per-user credential.
    pub auth_token: String,
    /// Absolute expiry as a Unix timestamp in seconds.
    pub expires_at: i64,
}

impl std::fmt::Debug for IngressGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressGrant")
            .field("auth_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Minimal vendor projection exposed by the sample protected endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VendorSummary {
    pub code: String,
}

/// The upstream calls the gateway makes.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Log in as the service account and return its credential.
    async fn login(&self, username: &str, password: &str) -> Result<String, UpstreamError>;

    /// Exchange a single-use ingress token for a per-user credential.
    async fn verify_ingress(
        &self,
        ingress_token: &str,
        service_credential: &str,
    ) -> Result<IngressGrant, UpstreamError>;

    /// List active vendors visible to `auth_token`.
    async fn list_active_vendors(&self, auth_token: &str)
        -> Result<Vec<VendorSummary>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct HttpIdentityApi {
    base_url: Url,
    http: Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    auth_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyIngressResponse {
    #[serde(default)]
    auth_token: String,
    #[serde(deserialize_with = "int_or_string")]
    expires_at: i64,
}

#[derive(Deserialize)]
struct VendorsResponse {
    #[serde(default)]
    list: Vec<VendorSummary>,
}

impl HttpIdentityApi {
    pub fn new(base_url: Url) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::Request(format!("invalid endpoint {path}: {e}")))
    }

    async fn post_json<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        body: serde_json::Value,
    ) -> Result<T, UpstreamError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.http.post(self.endpoint(path)?).json(&body);
        if let Some(token) = auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, username: &str, password: &str) -> Result<String, UpstreamError> {
        let response: LoginResponse = self
            .post_json(
                LOGIN_PATH,
                None,
                json!({ "username": username, "plainTextPassword": password }),
            )
            .await?;

        if response.auth_token.is_empty() {
            return Err(UpstreamError::EmptyCredential);
        }
        Ok(response.auth_token)
    }

    async fn verify_ingress(
        &self,
        ingress_token: &str,
        service_credential: &str,
    ) -> Result<IngressGrant, UpstreamError> {
        let response: VerifyIngressResponse = self
            .post_json(
                VERIFY_INGRESS_PATH,
                Some(service_credential),
                json!({ "token": ingress_token }),
            )
            .await?;

        if response.auth_token.is_empty() {
            return Err(UpstreamError::EmptyCredential);
        }
        Ok(IngressGrant {
            auth_token: response.auth_token,
            expires_at: response.expires_at,
        })
    }

    async fn list_active_vendors(
        &self,
        auth_token: &str,
    ) -> Result<Vec<VendorSummary>, UpstreamError> {
        let response: VendorsResponse = self
            .post_json(
                VENDORS_FILTER_PATH,
                Some(auth_token),
                json!({ "isActive": "BOOL_FILTER_TRUE", "count": -1 }),
            )
            .await?;
        Ok(response.list)
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// 64-bit integers travel as JSON strings in the platform's JSON mapping.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpIdentityApi {
        HttpIdentityApi::new(Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let api = client("https://api.example.com/platform");
        assert_eq!(
            api.endpoint(LOGIN_PATH).unwrap().as_str(),
            "https://api.example.com/platform/Scailo.LoginService/LoginAsEmployeePrimary"
        );

        let api = client("https://api.example.com");
        assert_eq!(
            api.endpoint(VERIFY_INGRESS_PATH).unwrap().as_str(),
            "https://api.example.com/Scailo.VaultService/VerifyEnclaveIngress"
        );
    }

    #[test]
    fn verify_response_accepts_string_and_numeric_expiry() {
        let from_string: VerifyIngressResponse =
            serde_json::from_str(r#"{"authToken":"abc","expiresAt":"1700000000"}"#).unwrap();
        assert_eq!(from_string.expires_at, 1_700_000_000);

        let from_number: VerifyIngressResponse =
            serde_json::from_str(r#"{"authToken":"abc","expiresAt":1700000000}"#).unwrap();
        assert_eq!(from_number.expires_at, 1_700_000_000);

        assert!(serde_json::from_str::<VerifyIngressResponse>(
            r#"{"authToken":"abc","expiresAt":"soon"}"#
        )
        .is_err());
    }

    #[test]
    fn vendors_response_ignores_unknown_fields() {
        let parsed: VendorsResponse = serde_json::from_str(
            r#"{"list":[{"code":"V-1","name":"Acme"},{"code":"V-2"}],"total":2}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.list,
            vec![
                VendorSummary { code: "V-1".into() },
                VendorSummary { code: "V-2".into() }
            ]
        );
    }

    #[test]
    fn grant_debug_hides_token() {
        let grant = IngressGrant {
            auth_token: "user-secret".into(),
            expires_at: 1,
        };
        assert!(!format!("{grant:?}").contains("user-secret"));
    }
}

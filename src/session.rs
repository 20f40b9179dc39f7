// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Cookie Codec
//!
//! User sessions live entirely in the client: a [`SessionRecord`] is
//! serialized to JSON, sealed with ChaCha20-Poly1305 and carried in the
//! enclave's session cookie. The server only touches it when issuing or
//! verifying.
//!
//! ## Wire format
//!
//! `base64url_unpadded(nonce[12] || ciphertext || tag[16])`, with the cookie
//! name bound in as associated data so a value cannot be replayed under a
//! different cookie.
//!
//! ## Failure policy
//!
//! [`SessionCodec::decode`] fails closed. Any decoding, authentication or
//! payload problem, an expiry at or before "now", a foreign session key or an
//! empty credential all yield `None`.

use std::fmt;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on any session lifetime (24 hours).
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// Nonce length for ChaCha20-Poly1305 (12 bytes).
const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes).
const AUTH_TAG_LEN: usize = 16;

/// 256-bit cookie encryption key, derived once from the configured secret.
#[derive(Clone)]
pub struct CookieCipherKey([u8; 32]);

impl CookieCipherKey {
    /// Derive the key as `SHA-256(secret)`.
    pub fn from_secret(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }
}

impl fmt::Debug for CookieCipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CookieCipherKey(<redacted>)")
    }
}

/// Decrypted content of a session cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Enclave-scoped key, `<enclave_name>_auth_token`.
    pub key: String,
    /// Per-user (or, in development, service) credential.
    pub credential: String,
    /// Unix timestamp (seconds) after which the record is void.
    pub expires_at: i64,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("key", &self.key)
            .field("credential", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SessionRecord {
    /// Build a record valid for `max_age` from `now`, capped at [`SESSION_MAX_AGE`].
    pub fn issue(
        key: impl Into<String>,
        credential: impl Into<String>,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let max_age = clamp_max_age(max_age);
        Self {
            key: key.into(),
            credential: credential.into(),
            expires_at: now.timestamp() + max_age.as_secs() as i64,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}

/// Cap a requested lifetime at the session ceiling.
pub fn clamp_max_age(max_age: Duration) -> Duration {
    max_age.min(SESSION_MAX_AGE)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("session encryption failed")]
    Encrypt,
}

/// Seals and opens session cookies for one enclave.
pub struct SessionCodec {
    cipher: ChaCha20Poly1305,
    cookie_name: String,
}

impl SessionCodec {
    /// `cookie_name` doubles as the session key stored inside the record.
    pub fn new(key: &CookieCipherKey, cookie_name: impl Into<String>) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key.0)),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Build a record keyed for this enclave.
    pub fn issue(&self, credential: impl Into<String>, max_age: Duration) -> SessionRecord {
        SessionRecord::issue(self.cookie_name.clone(), credential, max_age, Utc::now())
    }

    /// Encrypt a record into a cookie value.
    pub fn encode(&self, record: &SessionRecord) -> Result<String, SessionError> {
        let plaintext = serde_json::to_vec(record)?;
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: self.cookie_name.as_bytes(),
                },
            )
            .map_err(|_| SessionError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(Base64UrlUnpadded::encode_string(&sealed))
    }

    /// Open a cookie value, checking expiry against the current time.
    pub fn decode(&self, cookie: &str) -> Option<SessionRecord> {
        self.decode_at(cookie, Utc::now())
    }

    /// Open a cookie value, checking expiry against `now`.
    pub fn decode_at(&self, cookie: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        let sealed = Base64UrlUnpadded::decode_vec(cookie.trim()).ok()?;
        if sealed.len() < NONCE_LEN + AUTH_TAG_LEN {
            return None;
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: self.cookie_name.as_bytes(),
                },
            )
            .ok()?;

        let record: SessionRecord = serde_json::from_slice(&plaintext).ok()?;
        if record.key != self.cookie_name
            || record.credential.is_empty()
            || record.is_expired_at(now)
        {
            return None;
        }
        Some(record)
    }
}

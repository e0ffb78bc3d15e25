//! Token store.
//!
//! Single owner of the persisted credentials: the access token, the refresh
//! token and the logged-in user's profile. Everything else in the crate reads
//! credentials through [`TokenStore`] instead of touching storage directly.
//!
//! Decoding is a client-side convenience only. Signatures are never verified
//! and nothing here is a security boundary; a malformed token simply reads as
//! "logged out".

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use shopfront_core::UserProfile;
use tracing::{debug, warn};

use crate::storage::{MemoryStorage, Storage};

/// Storage keys for persisted credentials.
pub mod keys {
    /// Key for the bearer access token.
    pub const AUTH_TOKEN: &str = "authToken";

    /// Key for the refresh token.
    pub const REFRESH_TOKEN: &str = "refreshToken";

    /// Key for the JSON-serialized user profile.
    pub const USER: &str = "user";
}

/// Claims read from a token's payload segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<f64>,
    /// Issued-at as seconds since the Unix epoch.
    #[serde(default)]
    pub iat: Option<f64>,
    /// Remaining claims (`sub`, `role`, custom fields).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// The `sub` claim, whether the backend encodes it as a string or number.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        match self.extra.get("sub")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        if !exp.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)] // NumericDate fits in i64 seconds
        let secs = exp.floor() as i64;
        DateTime::from_timestamp(secs, 0)
    }
}

/// What the stored credentials say about the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No access token stored.
    Anonymous,
    /// A token is stored and its expiry is in the future.
    Active,
    /// A token is stored but it is expired or undecodable.
    Expired,
}

/// Reads and writes credentials in a [`Storage`] backend.
///
/// Cloning is cheap; clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("auth_state", &self.auth_state())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// A store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// The current access token, if any.
    #[must_use]
    pub fn get_token(&self) -> Option<SecretString> {
        self.read(keys::AUTH_TOKEN).map(SecretString::from)
    }

    /// The current refresh token, if any.
    #[must_use]
    pub fn get_refresh_token(&self) -> Option<SecretString> {
        self.read(keys::REFRESH_TOKEN).map(SecretString::from)
    }

    /// Store a new token pair.
    ///
    /// Passing no refresh token removes any previously stored one so the pair
    /// never mixes two logins.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        self.write(keys::AUTH_TOKEN, access);
        if let Some(refresh) = refresh {
            self.write(keys::REFRESH_TOKEN, refresh);
        } else {
            self.remove(keys::REFRESH_TOKEN);
        }
    }

    /// Remove both tokens and the user profile.
    pub fn clear_tokens(&self) {
        self.remove(keys::AUTH_TOKEN);
        self.remove(keys::REFRESH_TOKEN);
        self.remove(keys::USER);
        debug!("Cleared stored credentials");
    }

    /// The stored user profile. An unparsable profile reads as absent.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.read(keys::USER)?;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(error = %e, "Stored user profile is not valid JSON"))
            .ok()
    }

    /// Persist the user profile.
    pub fn set_user(&self, profile: &UserProfile) {
        match serde_json::to_string(profile) {
            Ok(json) => self.write(keys::USER, &json),
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
    }

    /// True only when a token is stored and it has not expired.
    ///
    /// Presence alone is not enough: an expired token left behind by a
    /// previous session reads as unauthenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_state() == AuthState::Active
    }

    /// Classify the stored credentials.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.auth_state_at(Utc::now())
    }

    /// Classify the stored credentials against a given instant.
    #[must_use]
    pub fn auth_state_at(&self, now: DateTime<Utc>) -> AuthState {
        match self.get_token() {
            None => AuthState::Anonymous,
            Some(token) if Self::is_expired_at(token.expose_secret(), now) => AuthState::Expired,
            Some(_) => AuthState::Active,
        }
    }

    /// Decode a JWT's payload segment without verifying its signature.
    ///
    /// Returns `None` for anything that is not `header.payload[.signature]`
    /// with a base64url JSON object payload.
    #[must_use]
    pub fn decode(token: &str) -> Option<Claims> {
        let mut segments = token.split('.');
        let _header = segments.next()?;
        let payload = segments.next()?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// True when the token's expiry is in the past.
    ///
    /// Missing or undecodable expiry counts as expired.
    #[must_use]
    pub fn is_expired(token: &str) -> bool {
        Self::is_expired_at(token, Utc::now())
    }

    /// [`is_expired`](Self::is_expired) against a given instant.
    #[must_use]
    pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
        Self::decode(token)
            .and_then(|claims| claims.expires_at())
            .is_none_or(|expires_at| expires_at <= now)
    }

    // =========================================================================
    // Storage access
    // =========================================================================

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential storage");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set_item(key, value) {
            warn!(key, error = %e, "Failed to write credential storage");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            warn!(key, error = %e, "Failed to clear credential storage");
        }
    }
}

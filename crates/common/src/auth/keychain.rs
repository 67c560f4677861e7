//! Token storage on top of a secret store
//!
//! Secrets are plain strings keyed by name. [`KeychainProvider`] keeps them
//! in the platform keychain (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service) through `keyring`; [`MemorySecretStore`] keeps them
//! in process for tests and `--ephemeral` runs. [`KeychainTokenStore`] lays
//! OAuth tokens out over either one:
//!
//! - `access.<account>`: access token
//! - `refresh.<account>`: refresh token, when issued
//! - `metadata.<account>`: JSON with expiry, token type, id token and scope
//! - `identity`: the signed-in account

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::traits::TokenStore;
use super::types::TokenSet;

const ACCESS_PREFIX: &str = "access.";
const REFRESH_PREFIX: &str = "refresh.";
const METADATA_PREFIX: &str = "metadata.";
const IDENTITY_KEY: &str = "identity";

/// Secret storage failures
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String secrets by key.
pub trait SecretStore: Send + Sync {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// `Ok(None)` when the key does not exist.
    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError>;

    /// Idempotent.
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;
}

/// Platform keychain, namespaced by service name.
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, KeychainError> {
        keyring::Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to open keychain entry {key}: {e}"))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");
        self.entry(key)?.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to retrieve secret for {key}: {e}"
            ))),
        }
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {key}: {e}"
            ))),
        }
    }
}

/// In-process secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.secrets.lock().contains_key(key)
    }
}

impl SecretStore for MemorySecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.secrets.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError> {
        Ok(self.secrets.lock().get(key).cloned())
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.secrets.lock().remove(key);
        Ok(())
    }
}

/// [`TokenStore`] over any [`SecretStore`].
#[derive(Debug)]
pub struct KeychainTokenStore<S: SecretStore> {
    secrets: S,
}

impl<S: SecretStore> KeychainTokenStore<S> {
    pub const fn new(secrets: S) -> Self {
        Self { secrets }
    }

    pub const fn secrets(&self) -> &S {
        &self.secrets
    }

    fn write_tokens(&self, account: &str, tokens: &TokenSet) -> Result<(), KeychainError> {
        self.secrets.set_secret(&format!("{ACCESS_PREFIX}{account}"), &tokens.access_token)?;

        match &tokens.refresh_token {
            Some(refresh) => {
                self.secrets.set_secret(&format!("{REFRESH_PREFIX}{account}"), refresh)?;
            }
            None => self.secrets.delete_secret(&format!("{REFRESH_PREFIX}{account}"))?,
        }

        let metadata = json!({
            "expires_in": tokens.expires_in,
            "token_type": tokens.token_type,
            "id_token": tokens.id_token,
            "scope": tokens.scope,
            "expires_at": tokens.expires_at.map(|dt| dt.timestamp()),
        });
        self.secrets
            .set_secret(&format!("{METADATA_PREFIX}{account}"), &serde_json::to_string(&metadata)?)
    }

    fn read_tokens(&self, account: &str) -> Result<Option<TokenSet>, KeychainError> {
        let Some(access_token) = self.secrets.get_secret(&format!("{ACCESS_PREFIX}{account}"))?
        else {
            return Ok(None);
        };
        let refresh_token = self.secrets.get_secret(&format!("{REFRESH_PREFIX}{account}"))?;
        let metadata: serde_json::Value = match self
            .secrets
            .get_secret(&format!("{METADATA_PREFIX}{account}"))?
        {
            Some(raw) => serde_json::from_str(&raw)?,
            None => serde_json::Value::Null,
        };

        Ok(Some(TokenSet {
            access_token,
            refresh_token,
            id_token: metadata.get("id_token").and_then(|v| v.as_str()).map(String::from),
            token_type: metadata
                .get("token_type")
                .and_then(|v| v.as_str())
                .unwrap_or("Bearer")
                .to_string(),
            expires_in: metadata.get("expires_in").and_then(serde_json::Value::as_i64).unwrap_or(0),
            expires_at: metadata
                .get("expires_at")
                .and_then(serde_json::Value::as_i64)
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            scope: metadata.get("scope").and_then(|v| v.as_str()).map(String::from),
        }))
    }
}

#[async_trait]
impl<S: SecretStore> TokenStore for KeychainTokenStore<S> {
    async fn store_tokens(&self, account: &str, tokens: &TokenSet) -> Result<(), String> {
        debug!(account = %account, "Storing OAuth tokens");
        self.write_tokens(account, tokens).map_err(|e| e.to_string())
    }

    async fn retrieve_tokens(&self, account: &str) -> Result<Option<TokenSet>, String> {
        self.read_tokens(account).map_err(|e| e.to_string())
    }

    async fn delete_tokens(&self, account: &str) -> Result<(), String> {
        debug!(account = %account, "Deleting OAuth tokens");
        for prefix in [ACCESS_PREFIX, REFRESH_PREFIX, METADATA_PREFIX] {
            self.secrets.delete_secret(&format!("{prefix}{account}")).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    async fn store_identity(&self, account: &str) -> Result<(), String> {
        self.secrets.set_secret(IDENTITY_KEY, account).map_err(|e| e.to_string())
    }

    async fn load_identity(&self) -> Result<Option<String>, String> {
        self.secrets.get_secret(IDENTITY_KEY).map_err(|e| e.to_string())
    }

    async fn clear_identity(&self) -> Result<(), String> {
        self.secrets.delete_secret(IDENTITY_KEY).map_err(|e| e.to_string())
    }
}

/// Token store kept only for the lifetime of the process.
pub type MemoryTokenStore = KeychainTokenStore<MemorySecretStore>;

impl MemoryTokenStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySecretStore::new())
    }
}

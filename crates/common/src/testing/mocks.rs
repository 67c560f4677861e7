//! Mock implementations of the auth traits
//!
//! Each mock records how often it was called so tests can assert on
//! coalescing and retry behavior.

// Test mocks surface errors through their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::keychain::MemoryTokenStore;
use crate::auth::{
    ConsentFlow, ConsentGrant, OAuthClientError, OAuthClientTrait, TokenSet, TokenStore,
};

/// Scripted OAuth client.
///
/// Refresh results are served in the order they were pushed; once the queue
/// is empty every refresh fails with `NoRefreshToken`.
#[derive(Debug, Default)]
pub struct MockOAuthClient {
    refresh_results: Mutex<VecDeque<Result<TokenSet, OAuthClientError>>>,
    exchange_result: Mutex<Option<TokenSet>>,
    refresh_calls: AtomicUsize,
}

impl MockOAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_refresh(&self, result: Result<TokenSet, OAuthClientError>) {
        self.refresh_results.lock().push_back(result);
    }

    pub fn set_exchange_result(&self, tokens: TokenSet) {
        *self.exchange_result.lock() = Some(tokens);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn generate_authorization_url(&self) -> Result<(String, String), OAuthClientError> {
        Ok(("https://auth.test/authorize?state=mock".to_string(), "mock".to_string()))
    }

    async fn exchange_code_for_tokens(
        &self,
        _code: &str,
        state: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if state != "mock" {
            return Err(OAuthClientError::StateMismatch {
                expected: "mock".to_string(),
                received: state.to_string(),
            });
        }
        self.exchange_result
            .lock()
            .clone()
            .ok_or_else(|| OAuthClientError::ConfigError("no exchange result scripted".to_string()))
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_results.lock().pop_front().unwrap_or(Err(OAuthClientError::NoRefreshToken))
    }
}

/// Consent flow that grants (or refuses) without user interaction.
#[derive(Debug)]
pub struct MockConsentFlow {
    outcome: Result<(String, String), String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockConsentFlow {
    /// Every consent signs `account` in with `access_token`.
    pub fn granting(account: &str, access_token: &str) -> Self {
        Self {
            outcome: Ok((account.to_string(), access_token.to_string())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every consent is declined with `reason`.
    pub fn refusing(reason: &str) -> Self {
        Self { outcome: Err(reason.to_string()), delay: Duration::ZERO, calls: AtomicUsize::new(0) }
    }

    /// Simulates the user taking a while in the browser.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentFlow for MockConsentFlow {
    async fn obtain_consent(&self, _login_hint: Option<&str>) -> Result<ConsentGrant, String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.outcome {
            Ok((account, token)) => {
                let mut tokens =
                    TokenSet::new(token.clone(), Some(format!("refresh-{call}")), None, 3600, None);
                tokens.scope = Some("https://www.googleapis.com/auth/calendar".to_string());
                Ok(ConsentGrant { account: account.clone(), tokens })
            }
            Err(reason) => Err(reason.clone()),
        }
    }
}

/// In-memory token store that can be switched into a failing mode.
#[derive(Debug)]
pub struct MockTokenStore {
    inner: MemoryTokenStore,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self {
            inner: MemoryTokenStore::in_memory(),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }
}

impl MockTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), String> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            Err("keychain unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn store_tokens(&self, account: &str, tokens: &TokenSet) -> Result<(), String> {
        self.check_write()?;
        self.inner.store_tokens(account, tokens).await
    }

    async fn retrieve_tokens(&self, account: &str) -> Result<Option<TokenSet>, String> {
        self.inner.retrieve_tokens(account).await
    }

    async fn delete_tokens(&self, account: &str) -> Result<(), String> {
        self.inner.delete_tokens(account).await
    }

    async fn store_identity(&self, account: &str) -> Result<(), String> {
        self.check_write()?;
        self.inner.store_identity(account).await
    }

    async fn load_identity(&self) -> Result<Option<String>, String> {
        self.inner.load_identity().await
    }

    async fn clear_identity(&self) -> Result<(), String> {
        self.inner.clear_identity().await
    }
}

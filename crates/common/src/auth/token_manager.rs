//! Token lifecycle manager
//!
//! Sole writer of the access/refresh pair used against the calendar API:
//! - Restores a previous sign-in from the token store
//! - Hands out the current access token
//! - Refreshes via the refresh-token grant, falling back to interactive
//!   consent
//! - Coalesces concurrent refreshes into one in-flight attempt
//! - Clears everything when the identity signs out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::traits::{ConsentFlow, OAuthClientTrait, TokenStore};
use super::types::TokenSet;

/// Error type for token manager operations
#[derive(Debug)]
pub enum TokenManagerError {
    /// Token store operation failed
    StoreError(String),

    /// OAuth operation failed
    OAuthError(OAuthClientError),

    /// No tokens available
    NotAuthenticated,

    /// Refresh requested with nobody signed in
    NoIdentity,

    /// Neither the refresh grant nor consent produced tokens
    RefreshFailed(String),
}

impl std::fmt::Display for TokenManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreError(e) => write!(f, "Token store error: {e}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::NotAuthenticated => write!(f, "Not authenticated (no tokens)"),
            Self::NoIdentity => write!(f, "No authenticated identity to refresh"),
            Self::RefreshFailed(msg) => write!(f, "Token refresh failed: {msg}"),
        }
    }
}

impl std::error::Error for TokenManagerError {}

impl From<OAuthClientError> for TokenManagerError {
    fn from(err: OAuthClientError) -> Self {
        Self::OAuthError(err)
    }
}

#[derive(Debug, Default)]
struct TokenState {
    identity: Option<String>,
    tokens: Option<TokenSet>,
}

/// Owns the token pair for one identity session.
pub struct TokenLifecycleManager {
    store: Arc<dyn TokenStore>,
    oauth_client: Option<Arc<dyn OAuthClientTrait>>,
    consent: Option<Arc<dyn ConsentFlow>>,
    state: RwLock<TokenState>,
    refresh_gate: Mutex<()>,
    generation: AtomicU64,
    /// Number of refresh attempts that ran to completion.
    attempts: AtomicU64,
    /// Outcome of the latest completed attempt, errors as their message.
    last_attempt: SyncMutex<Option<(u64, Result<String, String>)>>,
    expiry_skew_seconds: i64,
}

impl TokenLifecycleManager {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            oauth_client: None,
            consent: None,
            state: RwLock::new(TokenState::default()),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            last_attempt: SyncMutex::new(None),
            expiry_skew_seconds: 0,
        }
    }

    /// Enables the silent refresh-token grant.
    #[must_use]
    pub fn with_oauth_client(mut self, client: Arc<dyn OAuthClientTrait>) -> Self {
        self.oauth_client = Some(client);
        self
    }

    /// Enables interactive re-consent when the grant is unavailable.
    #[must_use]
    pub fn with_consent_flow(mut self, consent: Arc<dyn ConsentFlow>) -> Self {
        self.consent = Some(consent);
        self
    }

    /// Treat tokens as expired this many seconds early.
    #[must_use]
    pub const fn with_expiry_skew(mut self, seconds: i64) -> Self {
        self.expiry_skew_seconds = seconds;
        self
    }

    /// Restores identity and tokens from the store. Returns whether a
    /// previous sign-in was found.
    pub async fn initialize(&self) -> Result<bool, TokenManagerError> {
        let identity = self.store.load_identity().await.map_err(TokenManagerError::StoreError)?;
        let Some(identity) = identity else {
            debug!("No stored identity");
            return Ok(false);
        };

        let tokens =
            self.store.retrieve_tokens(&identity).await.map_err(TokenManagerError::StoreError)?;
        let restored = tokens.is_some();
        {
            let mut state = self.state.write();
            state.identity = Some(identity);
            state.tokens = tokens;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        info!(restored_tokens = restored, "Token manager initialized from store");
        Ok(true)
    }

    /// Records a completed sign-in.
    pub async fn sign_in(&self, account: &str, tokens: TokenSet) -> Result<(), TokenManagerError> {
        self.store.store_identity(account).await.map_err(TokenManagerError::StoreError)?;
        self.persist(account, tokens).await?;
        info!("Signed in");
        Ok(())
    }

    /// Replaces the token pair for the signed-in identity.
    pub async fn set(
        &self,
        access_token: &str,
        refresh_token: Option<String>,
    ) -> Result<(), TokenManagerError> {
        self.set_token_set(TokenSet::from_pair(access_token, refresh_token)).await
    }

    /// Replaces the tokens, keeping the previous refresh token when the new
    /// set has none.
    pub async fn set_token_set(&self, mut tokens: TokenSet) -> Result<(), TokenManagerError> {
        let (identity, previous_refresh) = {
            let state = self.state.read();
            (
                state.identity.clone(),
                state.tokens.as_ref().and_then(|t| t.refresh_token.clone()),
            )
        };
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = previous_refresh;
        }

        match identity {
            Some(account) => self.persist(&account, tokens).await,
            None => {
                self.state.write().tokens = Some(tokens);
                self.generation.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
        }
    }

    /// Current access token, or `None` when absent or expired.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.state
            .read()
            .tokens
            .as_ref()
            .filter(|t| !t.is_expired(self.expiry_skew_seconds))
            .map(|t| t.access_token.clone())
    }

    /// Current access token, refreshing first if it is missing or expired.
    pub async fn access_token(&self) -> Result<String, TokenManagerError> {
        if let Some(token) = self.get() {
            return Ok(token);
        }
        if self.identity().is_none() {
            return Err(TokenManagerError::NotAuthenticated);
        }
        self.refresh().await
    }

    /// Obtains a fresh token pair and atomically replaces the stored state.
    ///
    /// Concurrent callers share one attempt: whoever arrives while a refresh
    /// is running waits for it and returns its outcome, failure included.
    pub async fn refresh(&self) -> Result<String, TokenManagerError> {
        let observed = self.generation.load(Ordering::Acquire);
        let observed_attempts = self.attempts.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(token) = self.get() {
                debug!("Joined a refresh completed by another caller");
                return Ok(token);
            }
        }
        let joined = self
            .last_attempt
            .lock()
            .as_ref()
            .filter(|(attempt, _)| *attempt > observed_attempts)
            .map(|(_, outcome)| outcome.clone());
        if let Some(outcome) = joined {
            debug!(succeeded = outcome.is_ok(), "Joined a refresh attempted by another caller");
            return outcome.map_err(TokenManagerError::RefreshFailed);
        }

        let outcome = self.refresh_locked().await;
        if matches!(outcome, Err(TokenManagerError::NoIdentity)) {
            return outcome;
        }
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = match &outcome {
            Ok(token) => Ok(token.clone()),
            Err(TokenManagerError::RefreshFailed(reason)) => Err(reason.clone()),
            Err(e) => Err(e.to_string()),
        };
        *self.last_attempt.lock() = Some((attempt, shared));
        outcome
    }

    /// One refresh attempt. Callers hold `refresh_gate`.
    async fn refresh_locked(&self) -> Result<String, TokenManagerError> {
        let (identity, refresh_token) = {
            let state = self.state.read();
            (
                state.identity.clone(),
                state.tokens.as_ref().and_then(|t| t.refresh_token.clone()),
            )
        };
        let identity = identity.ok_or(TokenManagerError::NoIdentity)?;

        let mut tokens = None;
        if let (Some(client), Some(refresh_token)) = (&self.oauth_client, refresh_token) {
            match client.refresh_access_token(&refresh_token).await {
                Ok(mut refreshed) => {
                    if refreshed.refresh_token.is_none() {
                        refreshed.refresh_token = Some(refresh_token);
                    }
                    tokens = Some(refreshed);
                }
                Err(e) => warn!(error = %e, "Refresh grant failed, falling back to consent"),
            }
        }

        let (account, tokens) = match tokens {
            Some(tokens) => (identity, tokens),
            None => {
                let consent = self.consent.as_ref().ok_or_else(|| {
                    TokenManagerError::RefreshFailed(
                        "refresh grant unavailable and no consent flow configured".to_string(),
                    )
                })?;
                let grant = consent
                    .obtain_consent(Some(&identity))
                    .await
                    .map_err(TokenManagerError::RefreshFailed)?;
                if grant.account != identity {
                    info!("Consent completed with a different account");
                    self.store.delete_tokens(&identity).await.map_err(TokenManagerError::StoreError)?;
                    self.store
                        .store_identity(&grant.account)
                        .await
                        .map_err(TokenManagerError::StoreError)?;
                    self.state.write().identity = Some(grant.account.clone());
                }
                (grant.account, grant.tokens)
            }
        };

        let access = tokens.access_token.clone();
        self.persist(&account, tokens).await?;
        info!("Access token refreshed");
        Ok(access)
    }

    /// Drops identity and tokens, in memory and in the store.
    pub async fn clear(&self) -> Result<(), TokenManagerError> {
        let identity = {
            let mut state = self.state.write();
            state.tokens = None;
            state.identity.take()
        };
        self.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(account) = identity {
            self.store.delete_tokens(&account).await.map_err(TokenManagerError::StoreError)?;
        }
        self.store.clear_identity().await.map_err(TokenManagerError::StoreError)?;

        info!("Tokens cleared (signed out)");
        Ok(())
    }

    #[must_use]
    pub fn identity(&self) -> Option<String> {
        self.state.read().identity.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.state.read();
        state.identity.is_some() && state.tokens.is_some()
    }

    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.state.read().tokens.as_ref().and_then(TokenSet::seconds_until_expiry)
    }

    async fn persist(&self, account: &str, tokens: TokenSet) -> Result<(), TokenManagerError> {
        self.store.store_tokens(account, &tokens).await.map_err(TokenManagerError::StoreError)?;
        {
            let mut state = self.state.write();
            state.identity = Some(account.to_string());
            state.tokens = Some(tokens);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl std::fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("identity", &self.identity())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

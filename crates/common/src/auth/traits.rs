//! Seams of the auth layer
//!
//! The token lifecycle manager only talks to these traits, so tests can
//! swap the identity provider, the interactive consent and the credential
//! storage independently.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::TokenSet;

/// OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Returns `(authorization_url, state)`.
    async fn generate_authorization_url(&self) -> Result<(String, String), OAuthClientError>;

    async fn exchange_code_for_tokens(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    async fn refresh_access_token(&self, refresh_token: &str)
        -> Result<TokenSet, OAuthClientError>;
}

/// Result of an interactive consent: who signed in and what they granted.
#[derive(Debug, Clone)]
pub struct ConsentGrant {
    pub account: String,
    pub tokens: TokenSet,
}

/// Interactive sign-in with the identity provider.
///
/// Implementations may block on user interaction for as long as it takes.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Runs the consent flow. `login_hint` preselects the account that is
    /// already signed in.
    async fn obtain_consent(&self, login_hint: Option<&str>) -> Result<ConsentGrant, String>;
}

/// Persistent credential storage
///
/// One signed-in identity at a time; tokens are keyed by account.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store_tokens(&self, account: &str, tokens: &TokenSet) -> Result<(), String>;

    /// `Ok(None)` when nothing is stored for the account.
    async fn retrieve_tokens(&self, account: &str) -> Result<Option<TokenSet>, String>;

    /// Idempotent.
    async fn delete_tokens(&self, account: &str) -> Result<(), String>;

    async fn store_identity(&self, account: &str) -> Result<(), String>;

    async fn load_identity(&self) -> Result<Option<String>, String>;

    async fn clear_identity(&self) -> Result<(), String>;
}

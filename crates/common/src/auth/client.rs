//! OAuth 2.0 client with PKCE support
//!
//! Handles the browser-based authorization-code flow:
//! - PKCE challenge generation
//! - Authorization URL building
//! - Authorization code exchange
//! - Refresh-token grant

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::pkce::PKCEChallenge;
use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, OAuthError, TokenResponse, TokenSet};

/// Error type for OAuth client operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed
    RequestFailed(reqwest::Error),

    /// OAuth server returned an error body
    OAuthError(OAuthError),

    /// Token endpoint answered with a non-OAuth failure
    HttpStatus { status: u16, body: String },

    /// State parameter mismatch (CSRF attack detected)
    StateMismatch { expected: String, received: String },

    /// Failed to parse response
    ParseError(String),

    /// No refresh token available
    NoRefreshToken,

    /// Invalid configuration
    ConfigError(String),
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::HttpStatus { status, body } => {
                write!(f, "Token endpoint returned {status}: {body}")
            }
            Self::StateMismatch { expected, received } => {
                write!(f, "State mismatch (CSRF): expected {expected}, received {received}")
            }
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OAuthClientError {}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// OAuth 2.0 client (RFC 6749 + RFC 7636).
///
/// One client serves one authorization attempt at a time: the pending PKCE
/// challenge is replaced by each [`generate_authorization_url`] call and
/// consumed by the code exchange.
///
/// [`generate_authorization_url`]: OAuthClient::generate_authorization_url
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
    current_challenge: Arc<Mutex<Option<PKCEChallenge>>>,
}

impl OAuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        let builder = if std::env::var_os("SECRELY_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self { config, client, current_challenge: Arc::new(Mutex::new(None)) }
    }

    /// Builds the browser authorization URL and remembers its PKCE challenge.
    ///
    /// Returns `(authorization_url, state)`; `state` must come back on the
    /// redirect.
    pub async fn generate_authorization_url(&self) -> Result<(String, String), OAuthClientError> {
        if self.config.redirect_uri.is_empty() {
            return Err(OAuthClientError::ConfigError("redirect URI not set".to_string()));
        }

        let challenge = PKCEChallenge::generate();
        let state = challenge.state.clone();

        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", &self.config.client_id),
            ("redirect_uri", &self.config.redirect_uri),
            ("state", &state),
            ("code_challenge", &challenge.code_challenge),
            ("code_challenge_method", challenge.challenge_method()),
        ];
        let scope = self.config.scope_string();
        params.push(("scope", &scope));
        params.extend(self.config.extra_authorize_params().iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{query_string}", self.config.authorization_url());

        *self.current_challenge.lock().await = Some(challenge);

        Ok((url, state))
    }

    /// Exchanges the redirect's authorization code for tokens.
    pub async fn exchange_code_for_tokens(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        let challenge =
            self.current_challenge.lock().await.take().ok_or_else(|| {
                OAuthClientError::ConfigError("No PKCE challenge found".to_string())
            })?;

        if challenge.state != state {
            return Err(OAuthClientError::StateMismatch {
                expected: challenge.state,
                received: state.to_string(),
            });
        }

        let form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
            ("code_verifier".to_string(), challenge.code_verifier),
        ];

        self.token_request(form).await
    }

    /// Runs the refresh-token grant. The response usually omits the refresh
    /// token; callers keep the one they sent.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];

        self.token_request(form).await
    }

    async fn token_request(
        &self,
        mut form: Vec<(String, String)>,
    ) -> Result<TokenSet, OAuthClientError> {
        form.push(("client_id".to_string(), self.config.client_id.clone()));
        if let Some(secret) = self.config.client_secret() {
            form.push(("client_secret".to_string(), secret.to_string()));
        }
        form.extend(self.config.extra_token_params().iter().cloned());

        debug!(endpoint = %self.config.token_url(), "Calling token endpoint");
        let response = self.client.post(self.config.token_url()).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(serde_json::from_str::<OAuthError>(&body).map_or_else(
                |_| OAuthClientError::HttpStatus { status: status.as_u16(), body: body.clone() },
                OAuthClientError::OAuthError,
            ));
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        Ok(token_response.into())
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    #[must_use]
    pub const fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn generate_authorization_url(&self) -> Result<(String, String), OAuthClientError> {
        self.generate_authorization_url().await
    }

    async fn exchange_code_for_tokens(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.exchange_code_for_tokens(code, state).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_access_token(refresh_token).await
    }
}

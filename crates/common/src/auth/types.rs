//! OAuth 2.0 types and structures
//!
//! Token sets, token endpoint responses and the provider configuration used
//! by [`OAuthClient`](super::OAuthClient).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 access and refresh tokens with metadata
///
/// - Optional refresh token (providers only issue one for offline access)
/// - Both `expires_in` (duration) and `expires_at` (timestamp)
/// - ID token support for OpenID Connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token sent as the bearer credential
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (JWT) containing user claims (OpenID Connect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Token type (always "Bearer" for OAuth 2.0)
    pub token_type: String,

    /// Access token lifetime in seconds, 0 when unknown
    pub expires_in: i64,

    /// Absolute expiration timestamp (UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a new `TokenSet`, deriving `expires_at` from `expires_in`.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
    ) -> Self {
        let expires_at = (expires_in > 0).then(|| Utc::now() + chrono::Duration::seconds(expires_in));

        Self {
            access_token,
            refresh_token,
            id_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// A bare access/refresh pair with no known lifetime.
    #[must_use]
    pub fn from_pair(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self::new(access_token.into(), refresh_token, None, 0, None)
    }

    /// True if the access token is expired or expires within
    /// `threshold_seconds`. Tokens without an expiry never expire.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() + chrono::Duration::seconds(threshold_seconds) >= expires_at)
    }

    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }
}

/// Token endpoint response (RFC 6749 §5.1).
///
/// Google omits `refresh_token` on refresh grants and some providers omit
/// `token_type`, so both are optional here.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let mut tokens = Self::new(
            response.access_token,
            response.refresh_token,
            response.id_token,
            response.expires_in,
            response.scope,
        );
        if let Some(token_type) = response.token_type {
            tokens.token_type = token_type;
        }
        tokens
    }
}

/// OAuth provider registration and endpoints.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    /// Loopback redirect for desktop apps; set once the callback port is known
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub extra_authorize_params: Vec<(String, String)>,
    pub extra_token_params: Vec<(String, String)>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            redirect_uri: String::new(),
            scopes,
            extra_authorize_params: Vec::new(),
            extra_token_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Adds a provider-specific query parameter to the authorization URL.
    #[must_use]
    pub fn with_authorize_param(mut self, key: &str, value: &str) -> Self {
        self.extra_authorize_params.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn authorization_url(&self) -> &str {
        &self.authorization_endpoint
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_endpoint
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    #[must_use]
    pub fn extra_authorize_params(&self) -> &[(String, String)] {
        &self.extra_authorize_params
    }

    #[must_use]
    pub fn extra_token_params(&self) -> &[(String, String)] {
        &self.extra_token_params
    }

    /// Scopes as a space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// OAuth error response from authorization server (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

//! Google sign-in for calendar access.
//!
//! [`BrowserConsentFlow`] runs the PKCE authorization-code flow through a
//! loopback callback server on an ephemeral port: the authorization URL is
//! handed to a prompt (the CLI prints it), the browser redirects back to
//! `http://127.0.0.1:<port>/callback`, and the code is exchanged through the
//! shared [`OAuthClient`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use secrely_common::auth::{ConsentFlow, ConsentGrant, OAuthClient, OAuthConfig, TokenSet};
use secrely_domain::{GoogleOAuthConfig, Result, SecrelyError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Scopes needed to identify the account and write events.
pub const GOOGLE_CALENDAR_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Google client registration and endpoints.
#[derive(Debug, Clone)]
pub struct GoogleOAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scopes: Vec<String>,
}

impl GoogleOAuthSettings {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: GOOGLE_USERINFO_ENDPOINT.to_string(),
            scopes: GOOGLE_CALENDAR_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn from_config(config: &GoogleOAuthConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(SecrelyError::Config("google.client_id is not configured".into()));
        }
        let mut settings = Self::new(config.client_id.clone(), config.client_secret.clone());
        for scope in &config.extra_scopes {
            if !settings.scopes.contains(scope) {
                settings.scopes.push(scope.clone());
            }
        }
        Ok(settings)
    }

    /// Points every endpoint at `base` (mock servers in tests).
    #[must_use]
    pub fn with_endpoint_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorization_endpoint = format!("{base}/o/oauth2/v2/auth");
        self.token_endpoint = format!("{base}/token");
        self.userinfo_endpoint = format!("{base}/v1/userinfo");
        self
    }

    /// Client configuration asking for offline access, so a refresh token
    /// is issued on every consent.
    pub fn oauth_config(&self, redirect_uri: &str) -> OAuthConfig {
        OAuthConfig::new(
            self.client_id.clone(),
            self.authorization_endpoint.clone(),
            self.token_endpoint.clone(),
            self.scopes.clone(),
        )
        .with_client_secret(self.client_secret.clone())
        .with_redirect_uri(redirect_uri)
        .with_authorize_param("access_type", "offline")
        .with_authorize_param("prompt", "consent")
    }

    /// Client used by the token manager for the refresh-token grant.
    pub fn refresh_client(&self) -> OAuthClient {
        OAuthClient::new(self.oauth_config(""))
    }
}

/// Shows the authorization URL to the user.
pub type AuthorizationPrompt = Arc<dyn Fn(&str) + Send + Sync>;

/// Interactive Google consent through the system browser.
pub struct BrowserConsentFlow {
    settings: GoogleOAuthSettings,
    prompt: AuthorizationPrompt,
    timeout: Duration,
    http: reqwest::Client,
}

impl BrowserConsentFlow {
    pub fn new(settings: GoogleOAuthSettings, prompt: AuthorizationPrompt) -> Self {
        Self { settings, prompt, timeout: DEFAULT_CONSENT_TIMEOUT, http: reqwest::Client::new() }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, login_hint: Option<&str>) -> Result<ConsentGrant> {
        let server = OAuthCallbackServer::start().await?;
        let redirect_uri = server.redirect_uri();

        let mut config = self.settings.oauth_config(&redirect_uri);
        if let Some(hint) = login_hint {
            config = config.with_authorize_param("login_hint", hint);
        }
        let client = OAuthClient::new(config);

        let (authorization_url, state) = client
            .generate_authorization_url()
            .await
            .map_err(|e| SecrelyError::Config(e.to_string()))?;
        server.set_expected_state(state.clone());

        info!(redirect_uri = %redirect_uri, "Waiting for Google consent");
        (self.prompt)(&authorization_url);

        let code = server.wait_for_code(self.timeout).await;
        server.shutdown().await;
        let code = code?;

        let tokens = client
            .exchange_code_for_tokens(&code, &state)
            .await
            .map_err(|e| SecrelyError::Auth(format!("authorization code exchange failed: {e}")))?;

        let account = self.account_email(&tokens).await?;
        debug!(account = %account, "Consent granted");
        Ok(ConsentGrant { account, tokens })
    }

    /// Email from the ID token, else from the userinfo endpoint.
    async fn account_email(&self, tokens: &TokenSet) -> Result<String> {
        if let Some(email) = tokens.id_token.as_deref().and_then(|t| extract_email_from_id_token(t).ok())
        {
            return Ok(email);
        }

        let response = self
            .http
            .get(&self.settings.userinfo_endpoint)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| SecrelyError::Network(format!("userinfo request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(crate::errors::http_status_error(response.status(), "userinfo"));
        }
        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| SecrelyError::InvalidInput(format!("malformed userinfo: {e}")))?;
        info.email.ok_or_else(|| SecrelyError::Auth("account email not disclosed".into()))
    }
}

#[async_trait]
impl ConsentFlow for BrowserConsentFlow {
    async fn obtain_consent(&self, login_hint: Option<&str>) -> std::result::Result<ConsentGrant, String> {
        self.run(login_hint).await.map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

/// Loopback HTTP server that receives the OAuth redirect.
pub struct OAuthCallbackServer {
    port: u16,
    expected_state: Arc<Mutex<Option<String>>>,
    codes: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl OAuthCallbackServer {
    /// Start the loopback server on an ephemeral port.
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|err| {
            SecrelyError::Network(format!("failed to bind OAuth loopback server: {err}"))
        })?;
        let port = listener
            .local_addr()
            .map_err(|err| SecrelyError::Network(format!("failed to determine port: {err}")))?
            .port();

        let expected_state = Arc::new(Mutex::new(None));
        let (codes_tx, codes_rx) = mpsc::unbounded_channel();

        let state_for_route = Arc::clone(&expected_state);
        let app = Router::new().route(
            "/callback",
            get(move |query: Query<HashMap<String, String>>| {
                handle_oauth_callback(query, Arc::clone(&state_for_route), codes_tx.clone())
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "OAuth callback server error");
            }
        });

        Ok(Self {
            port,
            expected_state,
            codes: tokio::sync::Mutex::new(codes_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Callbacks carrying any other `state` are rejected.
    pub fn set_expected_state(&self, state: String) {
        *self.expected_state.lock() = Some(state);
    }

    /// Awaits the authorization code.
    pub async fn wait_for_code(&self, timeout: Duration) -> Result<String> {
        if self.expected_state.lock().is_none() {
            return Err(SecrelyError::Config("OAuth expected state not configured".into()));
        }

        let mut codes = self.codes.lock().await;
        match tokio::time::timeout(timeout, codes.recv()).await {
            Ok(Some(result)) => result,
            Ok(None) => Err(SecrelyError::Internal("OAuth callback server stopped".into())),
            Err(_) => Err(SecrelyError::Auth(
                "timed out waiting for the authorization redirect".into(),
            )),
        }
    }

    /// Shut down the loopback server gracefully.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "OAuth callback server task failed");
            }
        }
    }
}

impl Drop for OAuthCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn handle_oauth_callback(
    Query(params): Query<HashMap<String, String>>,
    expected_state: Arc<Mutex<Option<String>>>,
    codes: mpsc::UnboundedSender<Result<String>>,
) -> Html<&'static str> {
    let expected = expected_state.lock().clone();
    let state_matches = expected.is_some() && params.get("state") == expected.as_ref();

    if !state_matches {
        return Html(FAILURE_PAGE);
    }

    if let Some(reason) = params.get("error") {
        let _ = codes.send(Err(SecrelyError::Auth(format!("consent refused: {reason}"))));
        return Html(FAILURE_PAGE);
    }

    match params.get("code") {
        Some(code) => {
            let _ = codes.send(Ok(code.clone()));
            Html(SUCCESS_PAGE)
        }
        None => Html(FAILURE_PAGE),
    }
}

const SUCCESS_PAGE: &str = r"<!DOCTYPE html>
<html>
<head><title>Secrely</title></head>
<body><h1>Calendar connected</h1><p>You can close this window and return to the terminal.</p></body>
</html>";

const FAILURE_PAGE: &str = r"<!DOCTYPE html>
<html>
<head><title>Secrely</title></head>
<body><h1>Sign-in failed</h1><p>Invalid or unexpected callback parameters.</p></body>
</html>";

/// Extract email from ID token (JWT). The signature is not verified; the
/// token came straight from the token endpoint over TLS.
pub fn extract_email_from_id_token(id_token: &str) -> Result<String> {
    let mut parts = id_token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SecrelyError::InvalidInput("invalid ID token format".into()));
    };

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).map_err(|err| {
        SecrelyError::InvalidInput(format!("failed to decode ID token payload: {err}"))
    })?;
    let claims: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|err| {
        SecrelyError::InvalidInput(format!("failed to parse ID token payload: {err}"))
    })?;

    claims
        .get("email")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SecrelyError::InvalidInput("email claim missing from ID token".into()))
}

//! OAuth 2.0 + PKCE and the token lifecycle
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐
//! │ TokenLifecycleManager │  sole writer of the token pair
//! └──────────┬────────────┘
//!            ├──► OAuthClientTrait  (refresh-token grant)
//!            ├──► ConsentFlow       (interactive re-consent)
//!            └──► TokenStore        (keychain / in-memory persistence)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use secrely_common::auth::{
//!     KeychainProvider, KeychainTokenStore, OAuthClient, OAuthConfig, TokenLifecycleManager,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig::new(
//!     "client-id.apps.googleusercontent.com",
//!     "https://accounts.google.com/o/oauth2/v2/auth",
//!     "https://oauth2.googleapis.com/token",
//!     vec!["https://www.googleapis.com/auth/calendar".to_string()],
//! );
//! let store = Arc::new(KeychainTokenStore::new(KeychainProvider::new("secrely.google")));
//! let manager = TokenLifecycleManager::new(store)
//!     .with_oauth_client(Arc::new(OAuthClient::new(config)));
//!
//! if manager.initialize().await? {
//!     let token = manager.access_token().await?;
//!     println!("bearer {}", token.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod keychain;
pub mod pkce;
pub mod token_manager;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use client::{OAuthClient, OAuthClientError};
pub use keychain::{
    KeychainError, KeychainProvider, KeychainTokenStore, MemorySecretStore, MemoryTokenStore,
    SecretStore,
};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, PKCEChallenge};
pub use token_manager::{TokenLifecycleManager, TokenManagerError};
pub use traits::{ConsentFlow, ConsentGrant, OAuthClientTrait, TokenStore};
pub use types::{OAuthConfig, OAuthError, TokenResponse, TokenSet};

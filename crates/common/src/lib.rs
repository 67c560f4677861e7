//! Modular common utilities shared across Secrely crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: validation helpers, PKCE primitives
//! - `runtime`: async infrastructure (OAuth HTTP client, test helpers)
//! - `platform`: platform integrations (token lifecycle, keychain storage)
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: mock implementations of the auth traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod validation;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "runtime", feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::{
    ConsentFlow, ConsentGrant, OAuthClient, OAuthClientError, OAuthConfig, TokenLifecycleManager,
    TokenManagerError, TokenSet, TokenStore,
};
#[cfg(feature = "foundation")]
pub use validation::{validate_email, validate_phone_number, ValidationError};

//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: waiting on asynchronous conditions
//! - **[`mocks`]**: mock implementations of the auth traits (`platform`)

pub mod async_utils;
#[cfg(feature = "platform")]
pub mod mocks;

pub use async_utils::{poll_until, timeout_ok};
#[cfg(feature = "platform")]
pub use mocks::{MockConsentFlow, MockOAuthClient, MockTokenStore};

//! # Secrely Infrastructure
//!
//! Adapters implementing the ports defined in `secrely-core`:
//! - HTTP client with retry
//! - Configuration loading (env, TOML/JSON files)
//! - Scheduling backend, Google Calendar, ElevenLabs integrations
//! - Websocket result channel for phone calls
//!
//! All I/O lives here; `secrely-core` stays pure.

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod realtime;

pub use errors::{http_status_error, InfraError};
pub use http::HttpClient;
pub use integrations::*;
pub use realtime::{ChannelSettings, RealtimeResultChannel, WebSocketResultChannelOpener};

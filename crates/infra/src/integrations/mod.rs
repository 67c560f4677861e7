//! External service integrations
//!
//! - `backend`: scheduling backend (extraction, outbound calls, signed URLs)
//! - `calendar`: Google Calendar booking and sign-in
//! - `elevenlabs`: conversational voice agent

pub mod backend;
pub mod calendar;
pub mod elevenlabs;

pub use backend::BackendClient;
pub use calendar::{BrowserConsentFlow, GoogleCalendarGateway, GoogleOAuthSettings};
pub use elevenlabs::ElevenLabsAgent;

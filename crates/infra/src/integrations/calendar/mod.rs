//! Google Calendar integration
//!
//! - [`GoogleCalendarGateway`]: event creation and calendar listing
//! - [`BrowserConsentFlow`]: interactive sign-in through a loopback redirect

pub mod gateway;
pub mod oauth;

pub use gateway::{EventDateTime, GoogleAttendee, GoogleCalendarGateway, GoogleEvent};
pub use oauth::{
    extract_email_from_id_token, AuthorizationPrompt, BrowserConsentFlow, GoogleOAuthSettings,
    OAuthCallbackServer, GOOGLE_CALENDAR_SCOPES,
};

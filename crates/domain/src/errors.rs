//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Secrely
///
/// Every failure is caught at a component boundary and turned into one of
/// these variants; nothing here is allowed to terminate the process.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SecrelyError {
    /// Microphone/media access was denied.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// A voice session or realtime channel could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The extraction service failed or returned no meeting.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Access token missing, expired or rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Token refresh could not be performed.
    #[error("Token refresh error: {0}")]
    Refresh(String),

    /// A proposal date could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The calendar API rejected the booking.
    #[error("Booking failed with status {status}: {body}")]
    Booking {
        /// Upstream HTTP status code.
        status: u16,
        /// Upstream response body.
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SecrelyError {
    /// True when the failure means the access token was not accepted.
    ///
    /// Booking callers use this to decide whether a refresh-and-retry is
    /// worthwhile.
    pub const fn is_auth_failure(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Booking { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Transient failures are retried silently instead of being shown.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the owner of the session should be shown this failure.
    ///
    /// Channel disconnects and network blips are retried quietly.
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Network(_) | Self::Connection(_))
    }

    /// Short human-readable headline for the error category.
    pub const fn headline(&self) -> &'static str {
        match self {
            Self::Permission(_) => "Microphone access is required to talk to the assistant",
            Self::Connection(_) => "Could not connect",
            Self::Extraction(_) => "Could not extract meeting details",
            Self::Auth(_) | Self::Refresh(_) => "Please sign in again",
            Self::InvalidDate(_) => "The meeting has an invalid date",
            Self::Booking { .. } => "The calendar rejected the event",
            Self::Config(_) => "Configuration problem",
            Self::Network(_) => "Network problem",
            Self::Security(_) => "Security problem",
            Self::NotFound(_) => "Not found",
            Self::InvalidInput(_) => "Invalid input",
            Self::Internal(_) => "Unexpected error",
        }
    }
}

/// Result type alias for Secrely operations
pub type Result<T> = std::result::Result<T, SecrelyError>;

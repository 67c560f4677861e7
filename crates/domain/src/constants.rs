//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Availability defaults
pub const DEFAULT_SLOT_START: &str = "09:00";
pub const DEFAULT_SLOT_END: &str = "17:00";
/// Sent to the agent when the user has not declared any availability.
pub const DEFAULT_AVAILABILITY: &str = "Mon-Fri: 9am-5pm";
pub const DEFAULT_HOST_NAME: &str = "User";

// Realtime result channel timing
pub const REALTIME_OPEN_DELAY_MS: u64 = 1000;
pub const REALTIME_RECONNECT_DELAY_MS: u64 = 3000;
pub const REALTIME_RESULTS_PATH: &str = "/api/twilio/results";

// Calendar API
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const CALL_STATUS_SUCCESS: &str = "success";

// Backend collaborator
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

// Voice agent
pub const ELEVENLABS_CONVAI_URL: &str = "wss://api.elevenlabs.io/v1/convai/conversation";

// Token handling
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "secrely.google";

//! Application configuration structures
//!
//! Every section carries serde defaults so a config file only needs the
//! values that differ from a local development setup.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_BACKEND_URL, DEFAULT_CALENDAR_ID, DEFAULT_HOST_NAME,
    DEFAULT_KEYCHAIN_SERVICE, ELEVENLABS_CONVAI_URL, GOOGLE_CALENDAR_API_BASE,
    REALTIME_OPEN_DELAY_MS, REALTIME_RECONNECT_DELAY_MS, REALTIME_RESULTS_PATH,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub calendar: CalendarConfig,
    pub google: GoogleOAuthConfig,
    pub agent: AgentConfig,
    pub realtime: RealtimeConfig,
    pub host: HostConfig,
}

/// Scheduling backend (extraction, call initiation, realtime results).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub realtime_path: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            realtime_path: REALTIME_RESULTS_PATH.to_string(),
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Websocket URL of the realtime result channel, derived from the HTTP
    /// base (`http` → `ws`, `https` → `wss`).
    pub fn realtime_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}{}", self.realtime_path)
    }
}

/// Calendar API target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub api_base: String,
    pub calendar_id: String,
    /// IANA zone name; falls back to `$TZ`, then UTC.
    pub timezone: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            timezone: None,
        }
    }
}

/// Google sign-in client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Extra scopes on top of the calendar and profile scopes.
    pub extra_scopes: Vec<String>,
    pub keychain_service: String,
}

impl Default for GoogleOAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            extra_scopes: Vec::new(),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }
}

/// Conversational voice agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent_id: Option<String>,
    pub endpoint: String,
    /// Ask the backend for a signed URL instead of connecting by agent id.
    pub use_signed_url: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { agent_id: None, endpoint: ELEVENLABS_CONVAI_URL.to_string(), use_signed_url: false }
    }
}

/// Reconnect policy of the realtime result channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub open_delay_ms: u64,
    pub reconnect_delay_ms: u64,
    /// 0 keeps reconnecting until the channel is torn down.
    pub max_reconnect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            open_delay_ms: REALTIME_OPEN_DELAY_MS,
            reconnect_delay_ms: REALTIME_RECONNECT_DELAY_MS,
            max_reconnect_attempts: 0,
        }
    }
}

/// The person the agent schedules on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub name: String,
    pub email: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { name: DEFAULT_HOST_NAME.to_string(), email: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.calendar.calendar_id, "primary");
        assert_eq!(config.realtime.reconnect_delay_ms, 3000);
        assert_eq!(config.realtime.max_reconnect_attempts, 0);
    }

    #[test]
    fn realtime_url_switches_scheme() {
        let mut backend = BackendConfig::default();
        assert_eq!(backend.realtime_url(), "ws://localhost:8000/api/twilio/results");

        backend.base_url = "https://sched.example.com/".into();
        assert_eq!(backend.realtime_url(), "wss://sched.example.com/api/twilio/results");
    }
}

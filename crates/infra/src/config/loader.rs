//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With no file anywhere, runs on the built-in defaults
//!
//! ## Environment Variables
//! Required for the environment path:
//! - `SECRELY_BACKEND_URL`: scheduling backend base URL
//! - `SECRELY_GOOGLE_CLIENT_ID`: OAuth client registration
//!
//! Optional (defaults from [`Config::default`]):
//! - `SECRELY_BACKEND_TIMEOUT_SECS`, `SECRELY_REALTIME_PATH`
//! - `SECRELY_CALENDAR_API_BASE`, `SECRELY_CALENDAR_ID`, `SECRELY_TIMEZONE`
//! - `SECRELY_GOOGLE_CLIENT_SECRET`, `SECRELY_GOOGLE_EXTRA_SCOPES`
//!   (comma-separated), `SECRELY_KEYCHAIN_SERVICE`
//! - `SECRELY_AGENT_ID`, `SECRELY_AGENT_ENDPOINT`, `SECRELY_AGENT_USE_SIGNED_URL`
//! - `SECRELY_REALTIME_OPEN_DELAY_MS`, `SECRELY_REALTIME_RECONNECT_DELAY_MS`,
//!   `SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS`
//! - `SECRELY_HOST_NAME`, `SECRELY_HOST_EMAIL`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./secrely.toml` or `./secrely.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use secrely_domain::{Config, Result, SecrelyError};

const FILE_NAMES: [&str; 4] = ["secrely.toml", "secrely.json", "config.toml", "config.json"];
const SEARCH_DIRS: [&str; 3] = [".", "..", "../.."];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If a required
/// variable is missing, falls back to a config file, and to the defaults
/// when no file exists.
///
/// # Errors
/// Returns `SecrelyError::Config` if a present source is invalid.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Environment incomplete, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::warn!("No config file found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SecrelyError::Config` if required variables are missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.backend.base_url = env_var("SECRELY_BACKEND_URL")?;
    config.google.client_id = env_var("SECRELY_GOOGLE_CLIENT_ID")?;

    if let Some(secs) = env_parse::<u64>("SECRELY_BACKEND_TIMEOUT_SECS")? {
        config.backend.timeout_secs = secs;
    }
    if let Some(path) = env_opt("SECRELY_REALTIME_PATH") {
        config.backend.realtime_path = path;
    }

    if let Some(base) = env_opt("SECRELY_CALENDAR_API_BASE") {
        config.calendar.api_base = base;
    }
    if let Some(id) = env_opt("SECRELY_CALENDAR_ID") {
        config.calendar.calendar_id = id;
    }
    config.calendar.timezone = env_opt("SECRELY_TIMEZONE");

    config.google.client_secret = env_opt("SECRELY_GOOGLE_CLIENT_SECRET");
    if let Some(scopes) = env_opt("SECRELY_GOOGLE_EXTRA_SCOPES") {
        config.google.extra_scopes = scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(service) = env_opt("SECRELY_KEYCHAIN_SERVICE") {
        config.google.keychain_service = service;
    }

    config.agent.agent_id = env_opt("SECRELY_AGENT_ID");
    if let Some(endpoint) = env_opt("SECRELY_AGENT_ENDPOINT") {
        config.agent.endpoint = endpoint;
    }
    config.agent.use_signed_url = env_bool("SECRELY_AGENT_USE_SIGNED_URL", false);

    if let Some(ms) = env_parse::<u64>("SECRELY_REALTIME_OPEN_DELAY_MS")? {
        config.realtime.open_delay_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("SECRELY_REALTIME_RECONNECT_DELAY_MS")? {
        config.realtime.reconnect_delay_ms = ms;
    }
    if let Some(max) = env_parse::<u32>("SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS")? {
        config.realtime.max_reconnect_attempts = max;
    }

    if let Some(name) = env_opt("SECRELY_HOST_NAME") {
        config.host.name = name;
    }
    config.host.email = env_opt("SECRELY_HOST_EMAIL");

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is picked
/// by file extension.
///
/// # Errors
/// Returns `SecrelyError::Config` if the file is missing, unreadable or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SecrelyError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SecrelyError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SecrelyError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SecrelyError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SecrelyError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SecrelyError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Rejects values that would only fail later, mid-session.
fn validate(config: &Config) -> Result<()> {
    if let Some(zone) = config.calendar.timezone.as_deref() {
        Tz::from_str(zone)
            .map_err(|_| SecrelyError::Config(format!("Unknown timezone: {zone}")))?;
    }
    for (name, value) in
        [("backend.base_url", &config.backend.base_url), ("calendar.api_base", &config.calendar.api_base)]
    {
        url::Url::parse(value)
            .map_err(|e| SecrelyError::Config(format!("Invalid {name} '{value}': {e}")))?;
    }
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| {
            SEARCH_DIRS
                .iter()
                .flat_map(move |dir| FILE_NAMES.iter().map(move |name| root.join(dir).join(name)))
        })
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        SecrelyError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Unset and blank are the same thing.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SecrelyError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_KEYS: [&str; 6] = [
        "SECRELY_BACKEND_URL",
        "SECRELY_GOOGLE_CLIENT_ID",
        "SECRELY_TIMEZONE",
        "SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS",
        "SECRELY_GOOGLE_EXTRA_SCOPES",
        "SECRELY_AGENT_USE_SIGNED_URL",
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for value in ["1", "true", "yes", "on", "TRUE"] {
            std::env::set_var("SECRELY_TEST_BOOL", value);
            assert!(env_bool("SECRELY_TEST_BOOL", false), "{value}");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("SECRELY_TEST_BOOL", value);
            assert!(!env_bool("SECRELY_TEST_BOOL", true), "{value}");
        }
        std::env::remove_var("SECRELY_TEST_BOOL");
        assert!(env_bool("SECRELY_TEST_BOOL", true));
    }

    #[test]
    fn load_from_env_with_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SECRELY_BACKEND_URL", "https://sched.example.com");
        std::env::set_var("SECRELY_GOOGLE_CLIENT_ID", "client.apps.googleusercontent.com");
        std::env::set_var("SECRELY_TIMEZONE", "America/New_York");
        std::env::set_var("SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS", "5");
        std::env::set_var("SECRELY_GOOGLE_EXTRA_SCOPES", "openid, ,email");
        std::env::set_var("SECRELY_AGENT_USE_SIGNED_URL", "yes");

        let config = load_from_env().expect("config from env");
        clear_env();

        assert_eq!(config.backend.base_url, "https://sched.example.com");
        assert_eq!(config.backend.realtime_url(), "wss://sched.example.com/api/twilio/results");
        assert_eq!(config.calendar.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(config.calendar.calendar_id, "primary");
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.reconnect_delay_ms, 3000);
        assert_eq!(config.google.extra_scopes, vec!["openid".to_string(), "email".to_string()]);
        assert!(config.agent.use_signed_url);
    }

    #[test]
    fn missing_required_var_is_a_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("SECRELY_GOOGLE_CLIENT_ID", "client");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(SecrelyError::Config(ref m)) if m.contains("SECRELY_BACKEND_URL")));
    }

    #[test]
    fn bad_number_and_bad_zone_are_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("SECRELY_BACKEND_URL", "http://localhost:8000");
        std::env::set_var("SECRELY_GOOGLE_CLIENT_ID", "client");

        std::env::set_var("SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS", "lots");
        assert!(matches!(load_from_env(), Err(SecrelyError::Config(_))));

        std::env::remove_var("SECRELY_REALTIME_MAX_RECONNECT_ATTEMPTS");
        std::env::set_var("SECRELY_TIMEZONE", "Mars/Olympus_Mons");
        let result = load_from_env();
        clear_env();
        assert!(matches!(result, Err(SecrelyError::Config(ref m)) if m.contains("timezone")));
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[backend]
base_url = "https://sched.example.com"

[calendar]
calendar_id = "team@group.calendar.google.com"
timezone = "Europe/Berlin"

[host]
name = "Ana"
email = "ana@example.com"
"#
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.calendar.calendar_id, "team@group.calendar.google.com");
        assert_eq!(config.host.name, "Ana");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.realtime.open_delay_ms, 1000);
    }

    #[test]
    fn load_from_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "realtime": {{ "reconnect_delay_ms": 500 }} }}"#).unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.realtime.reconnect_delay_ms, 500);
        assert_eq!(config.backend.base_url, "http://localhost:8000");
    }

    #[test]
    fn load_from_missing_file_fails() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/secrely.toml")));
        assert!(matches!(result, Err(SecrelyError::Config(_))));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "backend": "#).unwrap();

        assert!(load_from_file(Some(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = parse_config("backend: {}", Path::new("secrely.yaml"));
        assert!(matches!(result, Err(SecrelyError::Config(ref m)) if m.contains("yaml")));
    }
}

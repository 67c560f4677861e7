use std::time::Duration;

use secrely_domain::SecrelyError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "secrely=info,secrely_app=info,secrely_core=info,secrely_infra=info,warn";

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter. `SECRELY_LOG_FORMAT=json`
/// switches to JSON lines. Logs go to stderr so command output stays clean.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(
            "secrely=debug,secrely_app=debug,secrely_common=debug,secrely_core=debug,secrely_infra=debug,info",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let json = std::env::var("SECRELY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = if json { builder.json().try_init() } else { builder.compact().try_init() };
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` is a stable identifier such as `"booking::book"`; never pass
/// user data through it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, success: bool) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, "command_execution_failure");
    }
}

/// Convert a `SecrelyError` into a stable label suitable for metrics/logging.
#[inline]
pub const fn error_label(error: &SecrelyError) -> &'static str {
    match error {
        SecrelyError::Permission(_) => "permission",
        SecrelyError::Connection(_) => "connection",
        SecrelyError::Extraction(_) => "extraction",
        SecrelyError::Auth(_) => "auth",
        SecrelyError::Refresh(_) => "refresh",
        SecrelyError::InvalidDate(_) => "invalid_date",
        SecrelyError::Booking { .. } => "booking",
        SecrelyError::Config(_) => "config",
        SecrelyError::Network(_) => "network",
        SecrelyError::Security(_) => "security",
        SecrelyError::NotFound(_) => "not_found",
        SecrelyError::InvalidInput(_) => "invalid_input",
        SecrelyError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(error_label(&SecrelyError::Permission("mic".into())), "permission");
        assert_eq!(error_label(&SecrelyError::Booking { status: 401, body: String::new() }), "booking");
        assert_eq!(error_label(&SecrelyError::InvalidDate("x".into())), "invalid_date");
    }
}

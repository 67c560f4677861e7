//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use reqwest::Error as HttpError;
use reqwest::StatusCode;
use secrely_domain::SecrelyError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SecrelyError);

impl From<InfraError> for SecrelyError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SecrelyError> for InfraError {
    fn from(value: SecrelyError) -> Self {
        Self(value)
    }
}

trait IntoSecrelyError {
    fn into_secrely(self) -> SecrelyError;
}

/// Maps an HTTP status the collaborator answered with to the taxonomy.
pub fn http_status_error(status: StatusCode, context: &str) -> SecrelyError {
    let code = status.as_u16();
    let message = format!(
        "{context}: HTTP {code} {}",
        status.canonical_reason().unwrap_or("unknown status")
    );

    match code {
        401 | 403 => SecrelyError::Auth(message),
        404 => SecrelyError::NotFound(message),
        429 => SecrelyError::Network(message),
        400..=499 => SecrelyError::InvalidInput(message),
        _ => SecrelyError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → SecrelyError */
/* -------------------------------------------------------------------------- */

impl IntoSecrelyError for KeyringError {
    fn into_secrely(self) -> SecrelyError {
        let description = self.to_string();

        match self {
            Self::NoEntry => SecrelyError::NotFound("keychain entry not found".into()),
            Self::BadEncoding(_) => {
                SecrelyError::Security("credential in keychain is not valid UTF-8".into())
            }
            Self::PlatformFailure(err) => {
                SecrelyError::Security(format!("keychain platform error: {err}"))
            }
            Self::NoStorageAccess(err) => {
                SecrelyError::Security(format!("unable to access secure storage: {err}"))
            }
            _ => SecrelyError::Security(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        Self(value.into_secrely())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SecrelyError */
/* -------------------------------------------------------------------------- */

impl IntoSecrelyError for HttpError {
    fn into_secrely(self) -> SecrelyError {
        if self.is_timeout() {
            return SecrelyError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SecrelyError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return http_status_error(status, "request failed");
        }

        if self.is_decode() {
            return SecrelyError::InvalidInput(format!("malformed response body: {self}"));
        }

        SecrelyError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_secrely())
    }
}

/* -------------------------------------------------------------------------- */
/* tungstenite::Error → SecrelyError */
/* -------------------------------------------------------------------------- */

impl IntoSecrelyError for WsError {
    fn into_secrely(self) -> SecrelyError {
        match self {
            Self::Http(response) => {
                let status = response.status().as_u16();
                match status {
                    401 | 403 => SecrelyError::Auth(format!("websocket handshake rejected ({status})")),
                    _ => SecrelyError::Connection(format!("websocket handshake failed ({status})")),
                }
            }
            Self::ConnectionClosed | Self::AlreadyClosed => {
                SecrelyError::Connection("websocket closed".into())
            }
            Self::Url(err) => SecrelyError::Config(format!("invalid websocket URL: {err}")),
            other => SecrelyError::Connection(other.to_string()),
        }
    }
}

impl From<WsError> for InfraError {
    fn from(value: WsError) -> Self {
        Self(value.into_secrely())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

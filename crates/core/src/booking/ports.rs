//! Port interfaces for calendar booking

use async_trait::async_trait;
use secrely_common::auth::{TokenLifecycleManager, TokenManagerError};
use secrely_domain::{MeetingProposal, Result, SecrelyError};
use serde::{Deserialize, Serialize};

/// An event the calendar accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// A calendar the signed-in account can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    pub primary: bool,
    pub access_role: Option<String>,
}

/// Third-party calendar API.
///
/// Non-2xx responses come back as `SecrelyError::Booking` with the upstream
/// status and body. Gateways never refresh tokens themselves.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        proposal: &MeetingProposal,
    ) -> Result<CreatedEvent>;

    async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarSummary>>;
}

/// Where the booking flow gets bearer tokens from.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// The current token, refreshed first if it expired.
    async fn access_token(&self) -> Result<String>;

    /// A token that is fresh even if the current one looks valid.
    async fn refresh(&self) -> Result<String>;
}

#[async_trait]
impl AccessTokenSource for TokenLifecycleManager {
    async fn access_token(&self) -> Result<String> {
        Self::access_token(self).await.map_err(token_error)
    }

    async fn refresh(&self) -> Result<String> {
        Self::refresh(self).await.map_err(token_error)
    }
}

/// Maps token manager failures onto the auth part of the error taxonomy.
pub fn token_error(err: TokenManagerError) -> SecrelyError {
    match err {
        TokenManagerError::NotAuthenticated => {
            SecrelyError::Auth("not signed in to the calendar".into())
        }
        TokenManagerError::NoIdentity => {
            SecrelyError::Refresh("no authenticated identity to refresh".into())
        }
        TokenManagerError::StoreError(msg) => SecrelyError::Security(msg),
        other => SecrelyError::Refresh(other.to_string()),
    }
}

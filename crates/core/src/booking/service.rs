//! Booking service - places meeting proposals on the calendar

use std::sync::Arc;

use secrely_domain::constants::DEFAULT_CALENDAR_ID;
use secrely_domain::{MeetingProposal, Result, SecrelyError};
use tracing::{info, warn};

use super::ports::{AccessTokenSource, CalendarGateway, CalendarSummary, CreatedEvent};

/// Books proposals, retrying once after a token refresh when the calendar
/// rejects the token.
pub struct BookingService {
    gateway: Arc<dyn CalendarGateway>,
    tokens: Arc<dyn AccessTokenSource>,
    calendar_id: String,
}

impl BookingService {
    pub fn new(gateway: Arc<dyn CalendarGateway>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self { gateway, tokens, calendar_id: DEFAULT_CALENDAR_ID.to_string() }
    }

    #[must_use]
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Creates the event for `proposal`.
    ///
    /// An auth failure triggers exactly one refresh and one retry. Whatever
    /// the retry returns is final.
    pub async fn book(&self, proposal: &MeetingProposal) -> Result<CreatedEvent> {
        proposal.validate()?;

        let token = self.tokens.access_token().await?;
        let err = match self.gateway.create_event(&token, &self.calendar_id, proposal).await {
            Ok(event) => {
                info!(calendar_id = %self.calendar_id, event_id = %event.id, "Meeting booked");
                return Ok(event);
            }
            Err(err) if err.is_auth_failure() => err,
            Err(err) => return Err(err),
        };

        warn!(calendar_id = %self.calendar_id, error = %err, "Calendar rejected token, refreshing");
        let token = self.tokens.refresh().await?;
        let event = self
            .gateway
            .create_event(&token, &self.calendar_id, proposal)
            .await
            .map_err(|err| match err {
                SecrelyError::Auth(body) => SecrelyError::Booking { status: 401, body },
                other => other,
            })?;
        info!(
            calendar_id = %self.calendar_id,
            event_id = %event.id,
            attempt = 2,
            "Meeting booked after token refresh"
        );
        Ok(event)
    }

    /// Lists calendars, proving the token works.
    pub async fn check_access(&self) -> Result<Vec<CalendarSummary>> {
        let token = self.tokens.access_token().await?;
        match self.gateway.list_calendars(&token).await {
            Err(err) if err.is_auth_failure() => {
                let token = self.tokens.refresh().await?;
                self.gateway.list_calendars(&token).await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").field("calendar_id", &self.calendar_id).finish_non_exhaustive()
    }
}

//! Google Calendar event creation

use std::str::FromStr;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Method;
use secrely_core::{CalendarGateway, CalendarSummary, CreatedEvent};
use secrely_domain::{ensure_iso_format, CalendarConfig, MeetingProposal, Result, SecrelyError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// [`CalendarGateway`] over the Google Calendar v3 REST API.
///
/// Every non-2xx answer becomes [`SecrelyError::Booking`] carrying the
/// upstream status and body; the booking service decides whether a 401/403
/// deserves a refresh.
#[derive(Clone)]
pub struct GoogleCalendarGateway {
    http: HttpClient,
    api_base: String,
    timezone: Tz,
}

impl GoogleCalendarGateway {
    pub fn new(http: HttpClient, api_base: impl Into<String>, timezone: Tz) -> Self {
        Self { http, api_base: api_base.into().trim_end_matches('/').to_string(), timezone }
    }

    pub fn from_config(config: &CalendarConfig, http: HttpClient) -> Self {
        let timezone = secrely_domain::resolve_timezone(config.timezone.as_deref());
        Self::new(http, config.api_base.clone(), timezone)
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Builds the `events.insert` body for `proposal`.
    pub fn event_payload(&self, proposal: &MeetingProposal) -> Result<GoogleEvent> {
        let zone = proposal
            .timezone
            .as_deref()
            .and_then(|name| match Tz::from_str(name) {
                Ok(tz) => Some(tz),
                Err(_) => {
                    warn!(timezone = name, "Ignoring unknown proposal timezone");
                    None
                }
            })
            .unwrap_or(self.timezone);

        let start = ensure_iso_format(&proposal.start_date_time, zone)?;
        let end = ensure_iso_format(&proposal.end_date_time, zone)?;

        let attendees = proposal
            .attendees
            .iter()
            .flatten()
            .filter_map(|a| {
                a.email.as_ref().map(|email| GoogleAttendee {
                    display_name: Some(a.name.clone()),
                    email: email.clone(),
                })
            })
            .collect::<Vec<_>>();

        Ok(GoogleEvent {
            summary: proposal.title.clone(),
            description: proposal.description.clone(),
            start: EventDateTime { date_time: start, time_zone: zone.name().to_string() },
            end: EventDateTime { date_time: end, time_zone: zone.name().to_string() },
            location: proposal.location.clone().filter(|l| !l.trim().is_empty()),
            attendees: (!attendees.is_empty()).then_some(attendees),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.api_base, urlencoding::encode(calendar_id))
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        proposal: &MeetingProposal,
    ) -> Result<CreatedEvent> {
        let payload = self.event_payload(proposal)?;
        debug!(calendar_id, start = %payload.start.date_time, "Creating calendar event");

        let response = self
            .http
            .send(
                self.http
                    .request(Method::POST, self.events_url(calendar_id))
                    .bearer_auth(access_token)
                    .json(&payload),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecrelyError::Booking { status: status.as_u16(), body });
        }

        let created: GoogleCreatedEvent =
            response.json().await.map_err(|e| SecrelyError::from(InfraError::from(e)))?;
        Ok(CreatedEvent { id: created.id, html_link: created.html_link })
    }

    async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarSummary>> {
        let url = format!("{}/users/me/calendarList", self.api_base);
        let response = self
            .http
            .send(self.http.request(Method::GET, url).bearer_auth(access_token))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecrelyError::Booking { status: status.as_u16(), body });
        }

        let list: GoogleCalendarList =
            response.json().await.map_err(|e| SecrelyError::from(InfraError::from(e)))?;
        Ok(list
            .items
            .into_iter()
            .map(|entry| CalendarSummary {
                id: entry.id,
                summary: entry.summary.unwrap_or_default(),
                primary: entry.primary.unwrap_or(false),
                access_role: entry.access_role,
            })
            .collect())
    }
}

/// Google `Event` resource, restricted to what a booking sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<GoogleAttendee>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAttendee {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCreatedEvent {
    id: String,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarList {
    #[serde(default)]
    items: Vec<GoogleCalendarListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCalendarListEntry {
    id: String,
    summary: Option<String>,
    primary: Option<bool>,
    access_role: Option<String>,
}

//! Structured meeting details extracted from a conversation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SecrelyError};

/// A person invited to the meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Attendee {
    /// Parses `"Jane Doe <jane@example.com>"` or a bare name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Some((name, rest)) = value.split_once('<') {
            let email = rest.trim_end_matches('>').trim();
            return Self {
                name: name.trim().to_string(),
                email: (!email.is_empty()).then(|| email.to_string()),
            };
        }
        if value.contains('@') {
            return Self { name: value.to_string(), email: Some(value.to_string()) };
        }
        Self { name: value.to_string(), email: None }
    }
}

/// Meeting details pending calendar booking.
///
/// Produced by the extraction service or pushed over the realtime channel;
/// read-only from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "start_time")]
    pub start_date_time: String,
    #[serde(alias = "end_time")]
    pub end_date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl MeetingProposal {
    pub fn new(
        title: impl Into<String>,
        start_date_time: impl Into<String>,
        end_date_time: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_date_time: start_date_time.into(),
            end_date_time: end_date_time.into(),
            location: None,
            attendees: None,
            organizer: None,
            timezone: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Checks the required fields are present and non-blank.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("startDateTime", &self.start_date_time),
            ("endDateTime", &self.end_date_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SecrelyError::InvalidInput(format!(
                "meeting proposal is missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Reads a proposal from a collaborator payload.
    ///
    /// The backend sends either the bare proposal or one wrapped as
    /// `{"formData": {...}}`; both are accepted. `null` means "no meeting".
    pub fn from_payload(payload: &Value) -> Result<Option<Self>> {
        let inner = match payload {
            Value::Null => return Ok(None),
            Value::Object(map) => map.get("formData").unwrap_or(payload),
            other => {
                return Err(SecrelyError::Extraction(format!(
                    "expected a meeting object, got {other}"
                )))
            }
        };
        if inner.is_null() {
            return Ok(None);
        }
        let proposal: Self = serde_json::from_value(inner.clone())
            .map_err(|e| SecrelyError::Extraction(format!("malformed meeting payload: {e}")))?;
        proposal.validate().map_err(|e| SecrelyError::Extraction(e.to_string()))?;
        Ok(Some(proposal))
    }
}

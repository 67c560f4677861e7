//! Dynamic context handed to the agent when a conversation starts

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use secrely_domain::constants::DEFAULT_AVAILABILITY;
use secrely_domain::AvailabilityWeek;
use serde::Serialize;

/// Values the agent prompt refers to by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentContext {
    pub username: String,
    pub current_time_iso: String,
    /// Long weekday name in the session's timezone, e.g. `"Tuesday"`.
    pub current_day: String,
    pub timezone_info: String,
    pub available_time: String,
}

impl AgentContext {
    /// Builds the context for a conversation starting at `now`.
    ///
    /// Without declared availability the agent is told
    /// [`DEFAULT_AVAILABILITY`].
    pub fn build(
        now: DateTime<Utc>,
        tz: Tz,
        username: &str,
        availability: Option<&AvailabilityWeek>,
    ) -> Self {
        let local = now.with_timezone(&tz);
        let available_time = availability
            .filter(|week| !week.is_empty())
            .map_or_else(|| DEFAULT_AVAILABILITY.to_string(), AvailabilityWeek::serialize);

        Self {
            username: username.to_string(),
            current_time_iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            current_day: local.format("%A").to_string(),
            timezone_info: tz.name().to_string(),
            available_time,
        }
    }

    /// Name/value pairs as sent to the agent.
    pub fn dynamic_variables(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("username", self.username.clone()),
            ("current_time_iso", self.current_time_iso.clone()),
            ("current_day", self.current_day.clone()),
            ("timezone_info", self.timezone_info.clone()),
            ("available_time", self.available_time.clone()),
        ])
    }
}

//! Voice session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transcript::TranscriptEvent;
use crate::impl_domain_status_conversions;

/// Lifecycle of one conversation or call: `idle → connecting → active → ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Active,
    Ended,
}

impl_domain_status_conversions!(SessionStatus {
    Idle => "idle",
    Connecting => "connecting",
    Active => "active",
    Ended => "ended",
});

impl SessionStatus {
    /// Connecting or active.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

/// A single session from start request to termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub events: Vec<TranscriptEvent>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            status: SessionStatus::Idle,
            events: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

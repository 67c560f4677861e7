//! Transcript events produced by a voice session

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Who spoke a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Agent,
    User,
}

impl_domain_status_conversions!(Role {
    Agent => "Agent",
    User => "User",
});

/// One spoken line. Arrival order is implicit in the containing sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub role: Role,
    pub text: String,
}

impl TranscriptEvent {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// `"Agent: hello"`, the line format sent to the extraction service.
    pub fn line(&self) -> String {
        format!("{}: {}", self.role, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_uses_capitalized_role() {
        assert_eq!(TranscriptEvent::agent("Hi there").line(), "Agent: Hi there");
        assert_eq!(TranscriptEvent::user("Book Friday").line(), "User: Book Friday");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }
}

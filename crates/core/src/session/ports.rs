//! Port interfaces for voice sessions
//!
//! These traits define the boundaries between the session coordinator
//! and the media, voice agent and extraction adapters.

use async_trait::async_trait;
use secrely_domain::{MeetingProposal, Result, TranscriptEvent};
use tokio::sync::mpsc::UnboundedSender;

use super::context::AgentContext;

/// Access to the user's microphone (or whatever stands in for it).
#[async_trait]
pub trait MediaAccess: Send + Sync {
    /// Asks for capture permission.
    ///
    /// Fails with `SecrelyError::Permission` when the user declines.
    async fn request_microphone(&self) -> Result<()>;
}

/// Notifications from a live agent conversation, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// The agent confirmed the conversation is established.
    Connected { conversation_id: Option<String> },
    /// A spoken (or typed) line.
    Transcript(TranscriptEvent),
    /// The conversation is no longer active.
    Disconnected { reason: Option<String> },
    /// The agent reported a failure; the conversation is over.
    Error(String),
}

/// A conversation that has been opened with the agent.
#[async_trait]
pub trait AgentConnection: Send + Sync {
    /// Sends a typed user turn.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Ends the conversation. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Conversational voice agent.
#[async_trait]
pub trait VoiceAgent: Send + Sync {
    /// Opens a conversation seeded with `context`.
    ///
    /// Events are delivered on `events` until the conversation ends; the
    /// sender is dropped once nothing more will arrive.
    async fn connect(
        &self,
        context: AgentContext,
        events: UnboundedSender<AgentEvent>,
    ) -> Result<Box<dyn AgentConnection>>;
}

/// Turns a formatted transcript into a meeting proposal.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// `Ok(None)` when the conversation did not settle on a meeting.
    async fn extract(&self, transcript: &str) -> Result<Option<MeetingProposal>>;
}

//! Conversational AI websocket events.
//!
//! Inbound frames carry a `type` discriminator. Only the kinds a text-mode
//! session reacts to are modelled; everything else (audio, VAD scores,
//! tool calls) lands in [`ServerMessage::Unknown`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    UserTranscript {
        user_transcription_event: UserTranscription,
    },
    AgentResponse {
        agent_response_event: AgentResponse,
    },
    Ping {
        ping_event: PingEvent,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitiationMetadata {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserTranscription {
    pub user_transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentResponse {
    pub agent_response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingEvent {
    pub event_id: u64,
    #[serde(default)]
    pub ping_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConversationInitiationClientData { dynamic_variables: BTreeMap<&'static str, String> },
    UserMessage { text: String },
    Pong { event_id: u64 },
}

/// `None` for frames that do not parse; they are logged and skipped.
pub fn parse_server_message(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(error = %err, "Ignoring malformed agent frame");
            None
        }
    }
}

//! ElevenLabs Conversational AI

pub mod agent;
pub mod messages;

pub use agent::{ElevenLabsAgent, ElevenLabsConnection};
pub use messages::{ClientMessage, ServerMessage};

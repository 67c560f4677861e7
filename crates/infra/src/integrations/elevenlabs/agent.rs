//! Text-mode conversational agent over the ElevenLabs websocket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use secrely_core::{AgentConnection, AgentContext, AgentEvent, VoiceAgent};
use secrely_domain::{AgentConfig, Result, SecrelyError, TranscriptEvent};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{parse_server_message, ClientMessage, ServerMessage};
use crate::errors::InfraError;
use crate::integrations::backend::BackendClient;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// [`VoiceAgent`] that opens one conversation per session.
pub struct ElevenLabsAgent {
    endpoint: String,
    agent_id: Option<String>,
    signed_urls: Option<Arc<BackendClient>>,
}

impl ElevenLabsAgent {
    pub fn new(endpoint: impl Into<String>, agent_id: Option<String>) -> Self {
        Self { endpoint: endpoint.into(), agent_id, signed_urls: None }
    }

    /// Uses the backend's signed URLs when `use_signed_url` is set.
    pub fn from_config(config: &AgentConfig, backend: Arc<BackendClient>) -> Self {
        let agent = Self::new(config.endpoint.clone(), config.agent_id.clone());
        if config.use_signed_url {
            agent.with_signed_urls(backend)
        } else {
            agent
        }
    }

    #[must_use]
    pub fn with_signed_urls(mut self, backend: Arc<BackendClient>) -> Self {
        self.signed_urls = Some(backend);
        self
    }

    async fn session_url(&self) -> Result<String> {
        if let Some(backend) = &self.signed_urls {
            return backend.get_signed_url().await;
        }
        let agent_id = self.agent_id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| {
            SecrelyError::Config("agent.agent_id is required without a signed URL".into())
        })?;
        Ok(format!("{}?agent_id={}", self.endpoint, urlencoding::encode(agent_id)))
    }
}

#[async_trait]
impl VoiceAgent for ElevenLabsAgent {
    async fn connect(
        &self,
        context: AgentContext,
        events: UnboundedSender<AgentEvent>,
    ) -> Result<Box<dyn AgentConnection>> {
        let url = self.session_url().await?;
        let (socket, _response) =
            connect_async(url.as_str()).await.map_err(|e| SecrelyError::from(InfraError::from(e)))?;
        let (mut sink, stream) = socket.split();

        let init = ClientMessage::ConversationInitiationClientData {
            dynamic_variables: context.dynamic_variables(),
        };
        send_json(&mut sink, &init).await?;
        debug!(timezone = %context.timezone_info, "Agent conversation requested");

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(sink, stream, outgoing_rx, events));

        Ok(Box::new(ElevenLabsConnection {
            outgoing: Mutex::new(Some(outgoing_tx)),
            task: Mutex::new(Some(task)),
        }))
    }
}

/// Live conversation. Dropping it aborts the socket task.
pub struct ElevenLabsConnection {
    outgoing: Mutex<Option<UnboundedSender<ClientMessage>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl AgentConnection for ElevenLabsConnection {
    async fn send_text(&self, text: &str) -> Result<()> {
        let sender = self.outgoing.lock().clone();
        sender
            .ok_or_else(|| SecrelyError::Connection("conversation is closed".into()))?
            .send(ClientMessage::UserMessage { text: text.to_string() })
            .map_err(|_| SecrelyError::Connection("conversation is closed".into()))
    }

    async fn close(&self) -> Result<()> {
        // Dropping the sender makes the pump send a close frame and exit.
        drop(self.outgoing.lock().take());
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                warn!("Agent socket did not close in time, aborting");
                task.abort();
            }
        }
        Ok(())
    }
}

impl Drop for ElevenLabsConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn send_json(sink: &mut WsSink, message: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(message)
        .map_err(|e| SecrelyError::Internal(format!("failed to encode agent message: {e}")))?;
    sink.send(Message::Text(json.into())).await.map_err(|e| SecrelyError::from(InfraError::from(e)))
}

async fn pump(
    mut sink: WsSink,
    mut stream: futures_util::stream::SplitStream<WsStream>,
    mut outgoing: UnboundedReceiver<ClientMessage>,
    events: UnboundedSender<AgentEvent>,
) {
    loop {
        tokio::select! {
            message = outgoing.recv() => {
                let Some(message) = message else {
                    let _ = sink.send(Message::Close(None)).await;
                    debug!("Agent conversation closed locally");
                    break;
                };
                if let Err(err) = send_json(&mut sink, &message).await {
                    let _ = events.send(AgentEvent::Error(err.to_string()));
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = dispatch(text.as_str(), &events) {
                            if let Err(err) = send_json(&mut sink, &reply).await {
                                warn!(error = %err, "Failed to answer agent ping");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        info!(reason = ?reason, "Agent closed the conversation");
                        let _ = events.send(AgentEvent::Disconnected { reason });
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        let _ = events.send(AgentEvent::Error(err.to_string()));
                        break;
                    }
                    None => {
                        let _ = events.send(AgentEvent::Disconnected { reason: None });
                        break;
                    }
                }
            }
        }
    }
}

/// Forwards a frame to the coordinator; returns the reply it needs, if any.
fn dispatch(text: &str, events: &UnboundedSender<AgentEvent>) -> Option<ClientMessage> {
    let event = match parse_server_message(text)? {
        ServerMessage::ConversationInitiationMetadata { conversation_initiation_metadata_event } => {
            AgentEvent::Connected {
                conversation_id: conversation_initiation_metadata_event.conversation_id,
            }
        }
        ServerMessage::UserTranscript { user_transcription_event } => {
            AgentEvent::Transcript(TranscriptEvent::user(user_transcription_event.user_transcript))
        }
        ServerMessage::AgentResponse { agent_response_event } => {
            AgentEvent::Transcript(TranscriptEvent::agent(agent_response_event.agent_response))
        }
        ServerMessage::Ping { ping_event } => {
            return Some(ClientMessage::Pong { event_id: ping_event.event_id });
        }
        ServerMessage::Unknown => return None,
    };
    let _ = events.send(event);
    None
}

//! Fakes for driving the application without the network.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrely_app::context::token_manager;
use secrely_app::AppPorts;
use secrely_common::auth::{MemoryTokenStore, TokenLifecycleManager};
use secrely_core::{
    AgentConnection, AgentContext, AgentEvent, CallInitiator, CallReceipt, CallRequest,
    ExtractionService, ResultChannelHandle, ResultChannelOpener, ResultNotice, VoiceAgent,
};
use secrely_domain::{MeetingProposal, Result, SecrelyError, TranscriptEvent};
use secrely_infra::{GoogleCalendarGateway, HttpClient};
use tokio::sync::mpsc::UnboundedSender;

pub const CONVERSATION_ID: &str = "conv-test";
pub const GREETING: &str = "Hi! When would you like to meet?";

/// Agent that confirms the conversation, greets, and acknowledges every
/// typed turn.
#[derive(Default)]
pub struct EchoAgent {
    pub contexts: Mutex<Vec<AgentContext>>,
}

#[async_trait]
impl VoiceAgent for EchoAgent {
    async fn connect(
        &self,
        context: AgentContext,
        events: UnboundedSender<AgentEvent>,
    ) -> Result<Box<dyn AgentConnection>> {
        self.contexts.lock().push(context);
        let _ = events.send(AgentEvent::Connected { conversation_id: Some(CONVERSATION_ID.into()) });
        let _ = events.send(AgentEvent::Transcript(TranscriptEvent::agent(GREETING)));
        Ok(Box::new(EchoConnection { events: Mutex::new(Some(events)) }))
    }
}

pub struct EchoConnection {
    events: Mutex<Option<UnboundedSender<AgentEvent>>>,
}

#[async_trait]
impl AgentConnection for EchoConnection {
    async fn send_text(&self, text: &str) -> Result<()> {
        let events = self.events.lock().clone();
        let events = events.ok_or_else(|| SecrelyError::Connection("conversation is closed".into()))?;
        let _ = events.send(AgentEvent::Transcript(TranscriptEvent::user(text)));
        let _ = events.send(AgentEvent::Transcript(TranscriptEvent::agent(format!("Noted: {text}"))));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(events) = self.events.lock().take() {
            let _ = events.send(AgentEvent::Disconnected { reason: None });
        }
        Ok(())
    }
}

/// Extraction that returns a fixed answer and keeps what it was sent.
pub struct FixedExtraction {
    answer: Option<MeetingProposal>,
    pub transcripts: Mutex<Vec<String>>,
}

impl FixedExtraction {
    pub fn new(answer: Option<MeetingProposal>) -> Self {
        Self { answer, transcripts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl ExtractionService for FixedExtraction {
    async fn extract(&self, transcript: &str) -> Result<Option<MeetingProposal>> {
        self.transcripts.lock().push(transcript.to_string());
        Ok(self.answer.clone())
    }
}

/// Backend that accepts every call and remembers the requests.
#[derive(Default)]
pub struct RecordingInitiator {
    pub requests: Mutex<Vec<CallRequest>>,
}

#[async_trait]
impl CallInitiator for RecordingInitiator {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallReceipt> {
        self.requests.lock().push(request.clone());
        Ok(CallReceipt { status: "success".into(), message: None, call_sid: Some("CA-test".into()) })
    }

    async fn meeting_details(&self, _call_sid: &str) -> Result<Option<MeetingProposal>> {
        Ok(None)
    }
}

/// Result channel that pushes one proposal as soon as it opens.
pub struct PushingChannels {
    pub proposal: MeetingProposal,
}

struct ImmediateChannel(Mutex<bool>);

impl ResultChannelHandle for ImmediateChannel {
    fn teardown(&self) {
        *self.0.lock() = true;
    }

    fn is_closed(&self) -> bool {
        *self.0.lock()
    }
}

impl ResultChannelOpener for PushingChannels {
    fn open(&self, notices: UnboundedSender<ResultNotice>) -> Box<dyn ResultChannelHandle> {
        let _ = notices.send(ResultNotice::Meeting(self.proposal.clone()));
        Box::new(ImmediateChannel(Mutex::new(false)))
    }
}

pub fn http() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(1)
        .build()
        .expect("http client")
}

pub fn tokens() -> Arc<TokenLifecycleManager> {
    Arc::new(token_manager(Arc::new(MemoryTokenStore::in_memory())))
}

/// Ports backed by the fakes above and a calendar API at `calendar_base`.
pub fn ports(
    tokens: Arc<TokenLifecycleManager>,
    calendar_base: &str,
    extraction: Arc<FixedExtraction>,
) -> AppPorts {
    AppPorts {
        tokens,
        consent: None,
        agent: Arc::new(EchoAgent::default()),
        extraction,
        calendar: Arc::new(GoogleCalendarGateway::new(http(), calendar_base, chrono_tz::UTC)),
        initiator: Arc::new(RecordingInitiator::default()),
        channels: Arc::new(PushingChannels { proposal: proposal() }),
    }
}

pub fn proposal() -> MeetingProposal {
    MeetingProposal::new("Coffee with Sam", "2025-06-02T09:00:00", "2025-06-02T09:30:00")
        .with_description("Catch up")
}

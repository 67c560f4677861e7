use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrely_core::{AgentConnection, AgentContext, AgentEvent, ExtractionService, MediaAccess, VoiceAgent};
use secrely_domain::{MeetingProposal, Result, SecrelyError};
use tokio::sync::mpsc::UnboundedSender;

/// Microphone that is either granted or denied.
pub struct MockMedia {
    granted: bool,
}

impl MockMedia {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self { granted: true })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self { granted: false })
    }
}

#[async_trait]
impl MediaAccess for MockMedia {
    async fn request_microphone(&self) -> Result<()> {
        if self.granted {
            Ok(())
        } else {
            Err(SecrelyError::Permission("microphone access denied".into()))
        }
    }
}

#[derive(Default)]
struct AgentLog {
    sender: Option<UnboundedSender<AgentEvent>>,
    contexts: Vec<AgentContext>,
    sent: Vec<String>,
    closes: usize,
}

/// Voice agent whose side of the conversation is played by the test.
///
/// Closing the connection emits `Disconnected`, the way the real agent
/// reports the end of a conversation.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    log: Arc<Mutex<AgentLog>>,
    refuse: bool,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self { refuse: true, ..Self::default() }
    }

    pub fn emit(&self, event: AgentEvent) {
        if let Some(sender) = self.log.lock().unwrap().sender.as_ref() {
            let _ = sender.send(event);
        }
    }

    pub fn contexts(&self) -> Vec<AgentContext> {
        self.log.lock().unwrap().contexts.clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

struct ScriptedConnection {
    log: Arc<Mutex<AgentLog>>,
}

#[async_trait]
impl AgentConnection for ScriptedConnection {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.log.lock().unwrap().sent.push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.closes += 1;
        if let Some(sender) = log.sender.take() {
            let _ = sender.send(AgentEvent::Disconnected { reason: Some("closed".into()) });
        }
        Ok(())
    }
}

#[async_trait]
impl VoiceAgent for ScriptedAgent {
    async fn connect(
        &self,
        context: AgentContext,
        events: UnboundedSender<AgentEvent>,
    ) -> Result<Box<dyn AgentConnection>> {
        if self.refuse {
            return Err(SecrelyError::Network("connection refused".into()));
        }
        let mut log = self.log.lock().unwrap();
        log.contexts.push(context);
        log.sender = Some(events);
        Ok(Box::new(ScriptedConnection { log: Arc::clone(&self.log) }))
    }
}

/// Extraction service returning a scripted answer and recording payloads.
pub struct RecordingExtraction {
    answer: Mutex<Result<Option<MeetingProposal>>>,
    delay: Duration,
    calls: AtomicUsize,
    transcripts: Mutex<Vec<String>>,
}

impl RecordingExtraction {
    pub fn answering(answer: Result<Option<MeetingProposal>>) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(answer),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            transcripts: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(answer: Result<Option<MeetingProposal>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(answer),
            delay,
            calls: AtomicUsize::new(0),
            transcripts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_answer(&self, answer: Result<Option<MeetingProposal>>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn transcripts(&self) -> Vec<String> {
        self.transcripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionService for RecordingExtraction {
    async fn extract(&self, transcript: &str) -> Result<Option<MeetingProposal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcripts.lock().unwrap().push(transcript.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.lock().unwrap().clone()
    }
}

//! Session coordinator - core business logic
//!
//! Drives one conversation at a time through `idle → connecting → active →
//! ended`. Three things can end a session: an explicit stop, the agent
//! reporting the conversation is over, and an agent error. All of them go
//! through [`SessionCoordinator::stop`] or the event pump into the same
//! finalize routine, which dispatches each session's transcript to the
//! extraction service at most once.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use secrely_domain::constants::DEFAULT_HOST_NAME;
use secrely_domain::{
    impl_domain_status_conversions, AvailabilityWeek, MeetingProposal, Result, SecrelyError,
    Session, SessionStatus, TranscriptEvent,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::context::AgentContext;
use super::ports::{AgentConnection, AgentEvent, ExtractionService, MediaAccess, VoiceAgent};
use crate::transcript::{format_transcript, reconcile_events, TranscriptReconciler};

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeTrigger {
    Stop,
    StatusChange,
    AgentError,
    Replaced,
}

impl_domain_status_conversions!(FinalizeTrigger {
    Stop => "stop",
    StatusChange => "status_change",
    AgentError => "agent_error",
    Replaced => "replaced",
});

/// Result of finalizing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The extraction service produced a meeting; it is now the current
    /// proposal.
    Proposal(MeetingProposal),
    /// Nothing was said, so nothing was dispatched.
    NoTranscript,
    /// Another trigger already finalized this session, or it never started.
    AlreadyFinalized,
    /// Extraction failed or found no meeting. The previous proposal, if
    /// any, is kept.
    ExtractionFailed(SecrelyError),
}

struct LiveSession {
    session: Session,
    reconciler: TranscriptReconciler,
    conversation_id: Option<String>,
    dispatched: bool,
}

impl LiveSession {
    fn idle() -> Self {
        Self {
            session: Session::new(),
            reconciler: TranscriptReconciler::new(),
            conversation_id: None,
            dispatched: false,
        }
    }
}

/// State reachable from both the coordinator and its event pump.
struct Shared {
    extraction: Arc<dyn ExtractionService>,
    live: Mutex<LiveSession>,
    proposal: RwLock<Option<MeetingProposal>>,
    last_error: Mutex<Option<SecrelyError>>,
    status: watch::Sender<SessionStatus>,
    finalize_gate: tokio::sync::Mutex<()>,
}

impl Shared {
    fn set_status(&self, session_id: Uuid, status: SessionStatus) {
        {
            let mut live = self.live.lock();
            if live.session.id != session_id {
                return;
            }
            live.session.status = status;
        }
        self.status.send_replace(status);
    }

    fn mark_active(&self, session_id: Uuid, conversation_id: Option<String>) {
        {
            let mut live = self.live.lock();
            if live.session.id != session_id || live.session.status != SessionStatus::Connecting {
                return;
            }
            live.session.status = SessionStatus::Active;
            live.session.started_at = Some(Utc::now());
            live.reconciler.clear();
            live.conversation_id = conversation_id;
        }
        info!(session_id = %session_id, "Session active");
        self.status.send_replace(SessionStatus::Active);
    }

    fn record(&self, session_id: Uuid, event: TranscriptEvent) -> bool {
        let mut live = self.live.lock();
        if live.session.id != session_id || live.dispatched {
            return false;
        }
        live.reconciler.append(event)
    }

    fn record_error(&self, err: SecrelyError) {
        *self.last_error.lock() = Some(err);
    }

    async fn finalize(&self, session_id: Uuid, trigger: FinalizeTrigger) -> SessionOutcome {
        let _gate = self.finalize_gate.lock().await;

        let snapshot = {
            let mut live = self.live.lock();
            if live.session.id != session_id
                || live.dispatched
                || live.session.status == SessionStatus::Idle
            {
                debug!(session_id = %session_id, trigger = %trigger, "Session already finalized");
                return SessionOutcome::AlreadyFinalized;
            }
            live.dispatched = true;
            live.session.status = SessionStatus::Ended;
            live.session.ended_at = Some(Utc::now());
            let events = reconcile_events(&live.reconciler.drain());
            live.session.events.clone_from(&events);
            events
        };
        self.status.send_replace(SessionStatus::Ended);
        info!(
            session_id = %session_id,
            trigger = %trigger,
            lines = snapshot.len(),
            "Session ended"
        );

        if snapshot.is_empty() {
            return SessionOutcome::NoTranscript;
        }

        match self.extraction.extract(&format_transcript(&snapshot)).await {
            Ok(Some(proposal)) => {
                info!(session_id = %session_id, title = %proposal.title, "Meeting proposal extracted");
                *self.proposal.write() = Some(proposal.clone());
                SessionOutcome::Proposal(proposal)
            }
            Ok(None) => {
                warn!(session_id = %session_id, "Extraction found no meeting");
                let err = SecrelyError::Extraction("no meeting found in the conversation".into());
                self.record_error(err.clone());
                SessionOutcome::ExtractionFailed(err)
            }
            Err(err) => {
                error!(session_id = %session_id, error = %err, "Transcript extraction failed");
                let err = match err {
                    SecrelyError::Extraction(_) => err,
                    other => SecrelyError::Extraction(other.to_string()),
                };
                self.record_error(err.clone());
                SessionOutcome::ExtractionFailed(err)
            }
        }
    }
}

/// Orchestrates voice sessions end-to-end.
pub struct SessionCoordinator {
    media: Arc<dyn MediaAccess>,
    agent: Arc<dyn VoiceAgent>,
    shared: Arc<Shared>,
    host_name: String,
    timezone: Tz,
    connection: Mutex<Option<Arc<dyn AgentConnection>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCoordinator {
    pub fn new(
        media: Arc<dyn MediaAccess>,
        agent: Arc<dyn VoiceAgent>,
        extraction: Arc<dyn ExtractionService>,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        Self {
            media,
            agent,
            shared: Arc::new(Shared {
                extraction,
                live: Mutex::new(LiveSession::idle()),
                proposal: RwLock::new(None),
                last_error: Mutex::new(None),
                status,
                finalize_gate: tokio::sync::Mutex::new(()),
            }),
            host_name: DEFAULT_HOST_NAME.to_string(),
            timezone: Tz::UTC,
            connection: Mutex::new(None),
            pump: Mutex::new(None),
        }
    }

    /// Name the agent addresses the user by.
    #[must_use]
    pub fn with_host_name(mut self, name: impl Into<String>) -> Self {
        self.host_name = name.into();
        self
    }

    #[must_use]
    pub const fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Starts a new session, ending the current one first if it is live.
    ///
    /// Returns once the agent connection is open; the session turns
    /// `active` when the agent confirms it. Fails with `Permission` when
    /// microphone access is denied and with `Connection` when the agent
    /// cannot be reached; both leave the coordinator `idle`.
    pub async fn start(&self, availability: Option<&AvailabilityWeek>) -> Result<Uuid> {
        if self.status().is_live() {
            let outcome = self.end_current(FinalizeTrigger::Replaced).await;
            debug!(outcome = ?outcome, "Previous session replaced");
        }
        let previous = self.pump.lock().take();
        if let Some(previous) = previous {
            // Let an extraction the old pump is running finish first.
            drop(self.shared.finalize_gate.lock().await);
            previous.abort();
        }

        let session_id = {
            let mut live = self.shared.live.lock();
            *live = LiveSession::idle();
            live.session.id
        };
        *self.shared.last_error.lock() = None;
        self.shared.set_status(session_id, SessionStatus::Connecting);
        info!(session_id = %session_id, "Starting session");

        if let Err(err) = self.media.request_microphone().await {
            warn!(session_id = %session_id, error = %err, "Microphone access denied");
            self.shared.set_status(session_id, SessionStatus::Idle);
            self.shared.record_error(err.clone());
            return Err(err);
        }

        let context =
            AgentContext::build(Utc::now(), self.timezone, &self.host_name, availability);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = match self.agent.connect(context, events_tx).await {
            Ok(connection) => Arc::<dyn AgentConnection>::from(connection),
            Err(err) => {
                error!(session_id = %session_id, error = %err, "Agent connection failed");
                self.shared.set_status(session_id, SessionStatus::Idle);
                let err = match err {
                    SecrelyError::Connection(_) | SecrelyError::Auth(_) => err,
                    other => SecrelyError::Connection(other.to_string()),
                };
                self.shared.record_error(err.clone());
                return Err(err);
            }
        };

        *self.connection.lock() = Some(connection);
        let pump = tokio::spawn(pump_events(Arc::clone(&self.shared), session_id, events_rx));
        *self.pump.lock() = Some(pump);
        Ok(session_id)
    }

    /// Explicit stop: closes the agent conversation and finalizes.
    pub async fn stop(&self) -> SessionOutcome {
        self.end_current(FinalizeTrigger::Stop).await
    }

    /// Sends a typed user turn and records it in the transcript.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let connection = self
            .connection
            .lock()
            .clone()
            .ok_or_else(|| SecrelyError::Connection("no active session".into()))?;
        let session_id = self.session_id();
        connection.send_text(text).await?;
        self.shared.record(session_id, TranscriptEvent::user(text));
        Ok(())
    }

    /// Finalizes the current session as if `trigger` fired.
    ///
    /// Safe to call any number of times; only the first call for a session
    /// dispatches its transcript.
    pub async fn finalize(&self, trigger: FinalizeTrigger) -> SessionOutcome {
        self.shared.finalize(self.session_id(), trigger).await
    }

    /// Current session status
    pub fn status(&self) -> SessionStatus {
        self.shared.live.lock().session.status
    }

    /// Status updates, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Id of the current (or most recent) session
    pub fn session_id(&self) -> Uuid {
        self.shared.live.lock().session.id
    }

    /// Snapshot of the current session, including the transcript so far.
    pub fn session(&self) -> Session {
        let live = self.shared.live.lock();
        let mut session = live.session.clone();
        if !live.dispatched {
            session.events = live.reconciler.snapshot();
        }
        session
    }

    /// Conversation id reported by the agent, once active.
    pub fn conversation_id(&self) -> Option<String> {
        self.shared.live.lock().conversation_id.clone()
    }

    /// Latest meeting proposal pushed by the backend
    pub fn proposal(&self) -> Option<MeetingProposal> {
        self.shared.proposal.read().clone()
    }

    /// Ends the current proposal's lifecycle without booking it.
    pub fn discard_proposal(&self) -> Option<MeetingProposal> {
        self.shared.proposal.write().take()
    }

    /// Most recent user-visible failure.
    pub fn last_error(&self) -> Option<SecrelyError> {
        self.shared.last_error.lock().clone()
    }

    async fn end_current(&self, trigger: FinalizeTrigger) -> SessionOutcome {
        let session_id = self.session_id();
        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            if let Err(err) = connection.close().await {
                warn!(session_id = %session_id, error = %err, "Closing agent conversation failed");
            }
        }
        self.shared.finalize(session_id, trigger).await
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("session_id", &self.session_id())
            .field("status", &self.status())
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

async fn pump_events(
    shared: Arc<Shared>,
    session_id: Uuid,
    mut events: mpsc::UnboundedReceiver<AgentEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            AgentEvent::Connected { conversation_id } => {
                shared.mark_active(session_id, conversation_id);
            }
            AgentEvent::Transcript(line) => {
                shared.record(session_id, line);
            }
            AgentEvent::Disconnected { reason } => {
                info!(session_id = %session_id, reason = ?reason, "Agent reported session end");
                shared.finalize(session_id, FinalizeTrigger::StatusChange).await;
                return;
            }
            AgentEvent::Error(message) => {
                error!(session_id = %session_id, error = %message, "Agent error");
                shared.record_error(SecrelyError::Connection(message));
                shared.finalize(session_id, FinalizeTrigger::AgentError).await;
                return;
            }
        }
    }
    // The agent went away without saying goodbye.
    shared.finalize(session_id, FinalizeTrigger::StatusChange).await;
}

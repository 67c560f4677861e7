//! Session lifecycle, transcript dispatch and proposal handling.

mod support;

use std::time::Duration;

use secrely_core::{AgentEvent, FinalizeTrigger, SessionCoordinator, SessionOutcome};
use secrely_domain::{AvailabilityWeek, SecrelyError, SessionStatus, TimeSlot, TranscriptEvent, Weekday};
use support::agent::{MockMedia, RecordingExtraction, ScriptedAgent};
use support::{proposal, settle};

fn coordinator(
    agent: &ScriptedAgent,
    extraction: &std::sync::Arc<RecordingExtraction>,
) -> SessionCoordinator {
    SessionCoordinator::new(MockMedia::granted(), std::sync::Arc::new(agent.clone()), extraction.clone())
        .with_host_name("Ana")
        .with_timezone(chrono_tz::Europe::Lisbon)
}

async fn active_session(agent: &ScriptedAgent, coordinator: &SessionCoordinator) {
    coordinator.start(None).await.unwrap();
    agent.emit(AgentEvent::Connected { conversation_id: Some("conv_42".into()) });
    settle().await;
}

#[tokio::test]
async fn denied_microphone_returns_to_idle() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let agent = ScriptedAgent::new();
    let coordinator = SessionCoordinator::new(
        MockMedia::denied(),
        std::sync::Arc::new(agent.clone()),
        extraction.clone(),
    );

    let err = coordinator.start(None).await.unwrap_err();

    assert!(matches!(err, SecrelyError::Permission(_)));
    assert_eq!(coordinator.status(), SessionStatus::Idle);
    assert!(agent.contexts().is_empty());
    assert!(matches!(coordinator.last_error(), Some(SecrelyError::Permission(_))));
}

#[tokio::test]
async fn unreachable_agent_is_a_connection_error() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let coordinator = coordinator(&ScriptedAgent::unreachable(), &extraction);

    let err = coordinator.start(None).await.unwrap_err();

    assert!(matches!(err, SecrelyError::Connection(ref m) if m.contains("refused")));
    assert_eq!(coordinator.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn agent_receives_dynamic_context() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    let mut week = AvailabilityWeek::new();
    week.push_slot(Weekday::Friday, TimeSlot::new("14:00", "16:00").unwrap());

    coordinator.start(Some(&week)).await.unwrap();

    let context = &agent.contexts()[0];
    assert_eq!(context.username, "Ana");
    assert_eq!(context.timezone_info, "Europe/Lisbon");
    assert!(context.available_time.contains("Fri: [14:00-16:00]"));
}

#[tokio::test]
async fn explicit_stop_then_status_change_dispatches_once() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("Design review"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::agent("When should we meet?")));
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Tuesday at ten")));
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Tuesday at ten")));
    settle().await;

    let outcome = coordinator.stop().await;
    settle().await;
    let again = coordinator.finalize(FinalizeTrigger::StatusChange).await;

    assert!(matches!(outcome, SessionOutcome::Proposal(ref p) if p.title == "Design review"));
    assert_eq!(again, SessionOutcome::AlreadyFinalized);
    assert_eq!(extraction.calls(), 1);
    assert_eq!(
        extraction.transcripts(),
        vec!["Agent: When should we meet?\nUser: Tuesday at ten".to_string()]
    );
    assert_eq!(agent.closes(), 1);
    assert_eq!(coordinator.session().events.len(), 2);
    assert_eq!(coordinator.status(), SessionStatus::Ended);
}

#[tokio::test]
async fn status_change_alone_finalizes() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("Lunch"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    let mut status = coordinator.subscribe();
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Lunch on Friday")));

    agent.emit(AgentEvent::Disconnected { reason: Some("agent hung up".into()) });
    tokio::time::timeout(Duration::from_secs(1), status.wait_for(|s| *s == SessionStatus::Ended))
        .await
        .unwrap()
        .unwrap();
    settle().await;

    assert_eq!(extraction.calls(), 1);
    assert_eq!(coordinator.proposal().map(|p| p.title), Some("Lunch".to_string()));
    assert_eq!(coordinator.stop().await, SessionOutcome::AlreadyFinalized);
    assert_eq!(extraction.calls(), 1);
}

#[tokio::test]
async fn agent_error_finalizes_and_records_error() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("Sync"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Sync at 9")));

    agent.emit(AgentEvent::Error("socket reset".into()));
    settle().await;

    assert_eq!(coordinator.status(), SessionStatus::Ended);
    assert_eq!(extraction.calls(), 1);
    assert!(matches!(coordinator.last_error(), Some(SecrelyError::Connection(ref m)) if m == "socket reset"));
}

#[tokio::test]
async fn empty_transcript_is_not_dispatched() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("never"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;

    assert_eq!(coordinator.stop().await, SessionOutcome::NoTranscript);
    assert_eq!(extraction.calls(), 0);
}

#[tokio::test]
async fn failed_extraction_keeps_previous_proposal() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("First"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("First meeting")));
    settle().await;
    coordinator.stop().await;

    extraction.set_answer(Err(SecrelyError::Network("backend down".into())));
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Second meeting")));
    settle().await;
    let outcome = coordinator.stop().await;

    assert!(matches!(outcome, SessionOutcome::ExtractionFailed(SecrelyError::Extraction(_))));
    assert_eq!(coordinator.proposal().map(|p| p.title), Some("First".to_string()));
}

#[tokio::test]
async fn no_meeting_found_is_an_extraction_failure() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Just saying hi")));
    settle().await;

    let outcome = coordinator.stop().await;

    assert!(matches!(outcome, SessionOutcome::ExtractionFailed(SecrelyError::Extraction(_))));
    assert!(coordinator.proposal().is_none());
}

#[tokio::test]
async fn starting_again_finalizes_the_live_session() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("Old"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    let first_id = coordinator.session_id();
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Old meeting")));
    settle().await;

    let second_id = coordinator.start(None).await.unwrap();

    assert_ne!(first_id, second_id);
    assert_eq!(extraction.calls(), 1);
    assert_eq!(agent.closes(), 1);
    assert_eq!(coordinator.status(), SessionStatus::Connecting);
    assert_eq!(coordinator.proposal().map(|p| p.title), Some("Old".to_string()));
}

#[tokio::test]
async fn typed_turns_are_sent_and_recorded() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;

    coordinator.send_text("Thursday 4pm please").await.unwrap();
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Thursday 4pm please")));
    settle().await;

    assert_eq!(agent.sent(), vec!["Thursday 4pm please".to_string()]);
    assert_eq!(coordinator.session().events, vec![TranscriptEvent::user("Thursday 4pm please")]);
}

#[tokio::test]
async fn send_without_session_fails() {
    let extraction = RecordingExtraction::answering(Ok(None));
    let coordinator = coordinator(&ScriptedAgent::new(), &extraction);

    assert!(matches!(
        coordinator.send_text("hello").await,
        Err(SecrelyError::Connection(_))
    ));
}

#[tokio::test]
async fn concurrent_triggers_wait_for_the_dispatch() {
    let extraction = RecordingExtraction::slow(
        Ok(Some(proposal("Slow"))),
        Duration::from_millis(30),
    );
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Slow meeting")));
    settle().await;

    let (a, b) = tokio::join!(
        coordinator.finalize(FinalizeTrigger::Stop),
        coordinator.finalize(FinalizeTrigger::StatusChange)
    );

    assert!(matches!(a, SessionOutcome::Proposal(_)));
    assert_eq!(b, SessionOutcome::AlreadyFinalized);
    assert_eq!(extraction.calls(), 1);
    assert!(coordinator.proposal().is_some());
}

#[tokio::test]
async fn discard_proposal_ends_its_lifecycle() {
    let extraction = RecordingExtraction::answering(Ok(Some(proposal("Standup"))));
    let agent = ScriptedAgent::new();
    let coordinator = coordinator(&agent, &extraction);
    active_session(&agent, &coordinator).await;
    agent.emit(AgentEvent::Transcript(TranscriptEvent::user("Standup at nine")));
    settle().await;
    coordinator.stop().await;

    assert_eq!(coordinator.discard_proposal().map(|p| p.title), Some("Standup".to_string()));
    assert!(coordinator.proposal().is_none());
}

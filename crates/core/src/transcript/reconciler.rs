//! Transcript reconciliation
//!
//! The voice SDK may deliver the same utterance twice in a row (interim and
//! final transcription). Only a repeat of the immediately preceding accepted
//! line is dropped; the same sentence said again later is kept.

use secrely_domain::TranscriptEvent;
use tracing::trace;

/// Ordered, adjacent-deduplicated transcript for one session.
#[derive(Debug, Clone, Default)]
pub struct TranscriptReconciler {
    events: Vec<TranscriptEvent>,
}

impl TranscriptReconciler {
    /// Create an empty reconciler
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` unless it repeats the last accepted `(role, text)`.
    ///
    /// Returns whether the event was stored.
    pub fn append(&mut self, event: TranscriptEvent) -> bool {
        if self.events.last() == Some(&event) {
            trace!(role = %event.role, "Dropping adjacent duplicate transcript line");
            return false;
        }
        self.events.push(event);
        true
    }

    /// Takes the accepted events in arrival order, leaving the reconciler
    /// empty.
    pub fn drain(&mut self) -> Vec<TranscriptEvent> {
        std::mem::take(&mut self.events)
    }

    /// Copy of the accepted events.
    pub fn snapshot(&self) -> Vec<TranscriptEvent> {
        self.events.clone()
    }

    /// Forget every accepted event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of accepted events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing has been accepted yet
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// `"Agent: ..."` / `"User: ..."` lines joined by newlines.
    pub fn format(&self) -> String {
        format_transcript(&self.events)
    }
}

/// Reruns adjacent-duplicate suppression over a buffered copy of events.
///
/// Idempotent: reconciling an already reconciled sequence returns it
/// unchanged.
pub fn reconcile_events(events: &[TranscriptEvent]) -> Vec<TranscriptEvent> {
    let mut reconciler = TranscriptReconciler::new();
    for event in events {
        reconciler.append(event.clone());
    }
    reconciler.drain()
}

/// Renders events as the transcript text sent to the extraction service.
pub fn format_transcript(events: &[TranscriptEvent]) -> String {
    events.iter().map(TranscriptEvent::line).collect::<Vec<_>>().join("\n")
}

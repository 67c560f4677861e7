//! Transcript handling

pub mod reconciler;

pub use reconciler::{format_transcript, reconcile_events, TranscriptReconciler};

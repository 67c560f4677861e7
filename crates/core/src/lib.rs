//! # Secrely Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Transcript reconciliation
//! - The session coordinator and the phone-call flow
//! - Booking with a single refresh-and-retry on auth failure
//! - Port/adapter interfaces (traits) for every collaborator
//!
//! ## Architecture Principles
//! - Only depends on `secrely-domain` and `secrely-common`
//! - No HTTP, websocket or platform code
//! - All external dependencies via traits

pub mod booking;
pub mod phone;
pub mod session;
pub mod transcript;

// Re-export specific items to avoid ambiguity
pub use booking::ports::{AccessTokenSource, CalendarGateway, CalendarSummary, CreatedEvent};
pub use booking::BookingService;
pub use phone::ports::{
    CallInitiator, CallReceipt, CallRequest, ResultChannelHandle, ResultChannelOpener,
    ResultNotice,
};
pub use phone::PhoneCallService;
pub use session::ports::{AgentConnection, AgentEvent, ExtractionService, MediaAccess, VoiceAgent};
pub use session::{AgentContext, FinalizeTrigger, SessionCoordinator, SessionOutcome};
pub use transcript::TranscriptReconciler;

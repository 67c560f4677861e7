//! Voice session orchestration

pub mod context;
pub mod coordinator;
pub mod ports;

pub use context::AgentContext;
pub use coordinator::{FinalizeTrigger, SessionCoordinator, SessionOutcome};

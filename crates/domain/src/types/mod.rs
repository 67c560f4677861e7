//! Domain types and models

pub mod availability;
pub mod meeting;
pub mod session;
pub mod transcript;

pub use availability::{AvailabilityWeek, SlotField, TimeSlot, Weekday};
pub use meeting::{Attendee, MeetingProposal};
pub use session::{Session, SessionStatus};
pub use transcript::{Role, TranscriptEvent};

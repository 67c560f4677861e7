//! Shared test helpers for `secrely-core` integration tests.
//!
//! Lightweight mocks for every port so the tests can focus on behaviour
//! instead of boilerplate.

#![allow(dead_code)]

pub mod agent;
pub mod calendar;
pub mod telephony;

use secrely_domain::MeetingProposal;

/// A proposal with every required field set.
pub fn proposal(title: &str) -> MeetingProposal {
    MeetingProposal::new(title, "2025-03-04T10:00:00Z", "2025-03-04T10:30:00Z")
        .with_description("Booked by voice")
}

/// Lets spawned tasks drain their queues on the current-thread runtime.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

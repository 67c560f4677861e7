//! Integration tests for the scheduling domain model
//!
//! Exercises the availability week, proposals and date coercion together the
//! way a booking flow uses them.

use chrono_tz::Tz;
use secrely_domain::{
    ensure_iso_format, AvailabilityWeek, MeetingProposal, SecrelyError, SlotField, TimeSlot,
    Weekday,
};

/// A user edits the week in several steps and saves it.
///
/// Scenario: business hours Mon-Fri, mornings only on Friday, weekend off
#[test]
fn test_week_editing_produces_agent_string() {
    let mut week = AvailabilityWeek::new();
    for day in [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday] {
        week.toggle_day(day);
    }
    week.add_slot(Weekday::Friday);
    week.update_slot(Weekday::Friday, 0, SlotField::End, "12:00").unwrap();

    // Saturday switched on and off again leaves nothing behind
    week.toggle_day(Weekday::Saturday);
    week.toggle_day(Weekday::Saturday);

    assert_eq!(
        week.serialize(),
        "Mon: [09:00-17:00]; Tue: [09:00-17:00]; Wed: [09:00-17:00]; Thu: [09:00-17:00]; \
         Fri: [09:00-12:00]; Sat: [Unavailable]; Sun: [Unavailable]"
    );
}

#[test]
fn test_empty_week_serializes_all_unavailable() {
    let week = AvailabilityWeek::new();
    assert!(week.is_empty());
    assert_eq!(week.serialize().matches("[Unavailable]").count(), 7);
}

#[test]
fn test_slots_are_kept_in_insertion_order() {
    let mut week = AvailabilityWeek::new();
    week.push_slot(Weekday::Sunday, TimeSlot::new("15:00", "16:00").unwrap());
    week.push_slot(Weekday::Sunday, TimeSlot::new("08:00", "09:00").unwrap());

    assert!(week.serialize().ends_with("Sun: [15:00-16:00, 08:00-09:00]"));
}

/// Proposal from the extraction backend with non-ISO dates is coerced before booking
#[test]
fn test_proposal_dates_coerce_for_booking() {
    let payload = serde_json::json!({
        "formData": {
            "title": "Design review",
            "description": "Walk through the mockups",
            "startDateTime": "2025-06-02 14:00",
            "endDateTime": "2025-06-02T15:00:00"
        }
    });
    let proposal = MeetingProposal::from_payload(&payload).unwrap().unwrap();

    let start = ensure_iso_format(&proposal.start_date_time, Tz::UTC).unwrap();
    let end = ensure_iso_format(&proposal.end_date_time, Tz::UTC).unwrap();

    assert_eq!(start, "2025-06-02T14:00:00.000Z");
    assert_eq!(end, "2025-06-02T15:00:00");
}

#[test]
fn test_unparsable_proposal_date_blocks_only_that_proposal() {
    let bad = MeetingProposal::new("Lunch", "sometime soon", "2025-06-02T13:00:00");
    let good = MeetingProposal::new("Lunch", "2025-06-02T12:00:00", "2025-06-02T13:00:00");

    assert!(matches!(
        ensure_iso_format(&bad.start_date_time, Tz::UTC),
        Err(SecrelyError::InvalidDate(_))
    ));
    assert!(ensure_iso_format(&good.start_date_time, Tz::UTC).is_ok());
}

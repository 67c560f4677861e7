//! Outbound phone-call flow and result channel ownership.

mod support;

use std::time::Duration;

use secrely_core::{PhoneCallService, ResultNotice};
use secrely_domain::{AvailabilityWeek, SecrelyError, TimeSlot, Weekday};
use support::proposal;
use support::telephony::{MockCallInitiator, MockChannelOpener};

fn monday_morning() -> AvailabilityWeek {
    let mut week = AvailabilityWeek::new();
    week.push_slot(Weekday::Monday, TimeSlot::new("09:00", "12:00").unwrap());
    week
}

#[tokio::test]
async fn call_request_carries_serialized_availability() {
    let initiator = MockCallInitiator::accepting("CA123");
    let opener = MockChannelOpener::new();
    let service = PhoneCallService::new(initiator.clone(), opener.clone())
        .with_host("Ana", Some("ana@example.com".into()));

    let receipt = service.place_call("+1 (555) 010-2030", &monday_morning()).await.unwrap();

    assert!(receipt.is_success());
    let request = &initiator.requests()[0];
    assert_eq!(request.phone_number, "+15550102030");
    assert_eq!(
        request.host_availability,
        "Mon: [09:00-12:00]; Tue: [Unavailable]; Wed: [Unavailable]; Thu: [Unavailable]; \
         Fri: [Unavailable]; Sat: [Unavailable]; Sun: [Unavailable]"
    );
    assert_eq!(request.host_name, "Ana");
    assert_eq!(request.host_email.as_deref(), Some("ana@example.com"));
    assert_eq!(opener.opened(), 1);
    assert_eq!(service.call_sid().as_deref(), Some("CA123"));
    assert!(service.has_open_channel());
}

#[tokio::test]
async fn rejected_call_opens_no_channel() {
    let opener = MockChannelOpener::new();
    let service = PhoneCallService::new(MockCallInitiator::rejecting("invalid number"), opener.clone());

    let err = service.place_call("+15550102030", &monday_morning()).await.unwrap_err();

    assert!(matches!(err, SecrelyError::Connection(ref m) if m.contains("invalid number")));
    assert_eq!(opener.opened(), 0);
}

#[tokio::test]
async fn bad_input_is_rejected_before_calling() {
    let initiator = MockCallInitiator::accepting("CA1");
    let service = PhoneCallService::new(initiator.clone(), MockChannelOpener::new());

    assert!(matches!(
        service.place_call("not a number", &monday_morning()).await,
        Err(SecrelyError::InvalidInput(_))
    ));
    assert!(matches!(
        service.place_call("+15550102030", &AvailabilityWeek::new()).await,
        Err(SecrelyError::InvalidInput(_))
    ));
    assert!(initiator.requests().is_empty());
}

#[tokio::test]
async fn pushed_meetings_arrive_in_order() {
    let opener = MockChannelOpener::new();
    let service = PhoneCallService::new(MockCallInitiator::accepting("CA1"), opener.clone());
    service.place_call("+15550102030", &monday_morning()).await.unwrap();

    opener.push(ResultNotice::Meeting(proposal("First")));
    opener.push(ResultNotice::Meeting(proposal("Second")));

    let first = service.next_proposal(Duration::from_millis(100)).await.unwrap();
    let second = service.next_proposal(Duration::from_millis(100)).await.unwrap();
    assert_eq!(first.map(|p| p.title), Some("First".to_string()));
    assert_eq!(second.map(|p| p.title), Some("Second".to_string()));
    assert_eq!(service.proposal().map(|p| p.title), Some("Second".to_string()));
    assert!(service.has_open_channel());
}

#[tokio::test]
async fn timeout_falls_back_to_polling() {
    let initiator = MockCallInitiator::accepting("CA9");
    let service = PhoneCallService::new(initiator.clone(), MockChannelOpener::new());
    service.place_call("+15550102030", &monday_morning()).await.unwrap();

    assert!(service.next_proposal(Duration::from_millis(10)).await.unwrap().is_none());

    initiator.set_details(proposal("Polled"));
    let polled = service.next_proposal(Duration::from_millis(10)).await.unwrap();
    assert_eq!(polled.map(|p| p.title), Some("Polled".to_string()));
    assert_eq!(initiator.polls(), 2);
}

#[tokio::test]
async fn exhausted_channel_reports_connection_error() {
    let opener = MockChannelOpener::new();
    let service = PhoneCallService::new(MockCallInitiator::accepting("CA1"), opener.clone());
    service.place_call("+15550102030", &monday_morning()).await.unwrap();

    opener.push(ResultNotice::GaveUp(SecrelyError::Connection("gave up after 3 attempts".into())));

    assert!(matches!(
        service.next_proposal(Duration::from_millis(100)).await,
        Err(SecrelyError::Connection(_))
    ));
    assert!(matches!(
        service.next_proposal(Duration::from_millis(10)).await,
        Err(SecrelyError::Connection(ref m)) if m == "no call in progress"
    ));
}

#[tokio::test]
async fn new_call_and_drop_tear_channels_down() {
    let opener = MockChannelOpener::new();
    let service = PhoneCallService::new(MockCallInitiator::accepting("CA1"), opener.clone());

    service.place_call("+15550102030", &monday_morning()).await.unwrap();
    service.place_call("+15550102031", &monday_morning()).await.unwrap();
    assert!(opener.is_torn_down(0));
    assert!(!opener.is_torn_down(1));

    drop(service);
    assert!(opener.is_torn_down(1));
}

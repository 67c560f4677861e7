//! Google Calendar gateway and the booking retry against a mock API.

mod support;

use std::sync::Arc;

use secrely_common::auth::{MemoryTokenStore, TokenLifecycleManager, TokenSet};
use secrely_common::testing::MockConsentFlow;
use secrely_core::{BookingService, CalendarGateway};
use secrely_domain::SecrelyError;
use secrely_infra::GoogleCalendarGateway;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{fast_http, proposal};

fn gateway(server: &MockServer) -> GoogleCalendarGateway {
    GoogleCalendarGateway::new(fast_http(), server.uri(), chrono_tz::UTC)
}

#[tokio::test]
async fn event_is_created_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer ya29.token"))
        .and(body_partial_json(json!({
            "summary": "Quarterly planning",
            "start": {"dateTime": "2025-03-04T10:00:00", "timeZone": "America/New_York"},
            "attendees": [{"displayName": "Dana Smith", "email": "dana@example.com"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-1",
            "htmlLink": "https://calendar.google.com/event?eid=evt-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = gateway(&server).create_event("ya29.token", "primary", &proposal()).await.unwrap();
    assert_eq!(created.id, "evt-1");
    assert_eq!(created.html_link.as_deref(), Some("https://calendar.google.com/event?eid=evt-1"));
}

#[tokio::test]
async fn rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/team%40example.com/events"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficientPermissions"))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway(&server).create_event("t", "team@example.com", &proposal()).await.unwrap_err();
    assert_eq!(err, SecrelyError::Booking { status: 403, body: "insufficientPermissions".into() });
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn calendars_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/calendarList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "primary-id", "summary": "Me", "primary": true, "accessRole": "owner"},
                {"id": "holidays", "summary": "Holidays", "accessRole": "reader"}
            ]
        })))
        .mount(&server)
        .await;

    let calendars = gateway(&server).list_calendars("t").await.unwrap();
    assert_eq!(calendars.len(), 2);
    assert!(calendars[0].primary);
    assert_eq!(calendars[1].access_role.as_deref(), Some("reader"));
}

#[tokio::test]
async fn booking_refreshes_once_after_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let consent = Arc::new(MockConsentFlow::granting("host@example.com", "fresh"));
    let tokens = Arc::new(
        TokenLifecycleManager::new(Arc::new(MemoryTokenStore::in_memory()))
            .with_consent_flow(consent.clone()),
    );
    tokens.sign_in("host@example.com", TokenSet::from_pair("stale", None)).await.unwrap();

    let booking = BookingService::new(Arc::new(gateway(&server)), tokens);
    let created = booking.book(&proposal()).await.unwrap();

    assert_eq!(created.id, "evt-2");
    assert_eq!(consent.calls(), 1);
}

#[tokio::test]
async fn booking_gives_up_after_second_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = Arc::new(
        TokenLifecycleManager::new(Arc::new(MemoryTokenStore::in_memory()))
            .with_consent_flow(Arc::new(MockConsentFlow::granting("host@example.com", "fresh"))),
    );
    tokens.sign_in("host@example.com", TokenSet::from_pair("stale", None)).await.unwrap();

    let err = BookingService::new(Arc::new(gateway(&server)), tokens)
        .book(&proposal())
        .await
        .unwrap_err();
    assert!(matches!(err, SecrelyError::Booking { status: 401, .. }), "got {err:?}");
}

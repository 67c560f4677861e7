use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrely_core::{AccessTokenSource, CalendarGateway, CalendarSummary, CreatedEvent};
use secrely_domain::{MeetingProposal, Result, SecrelyError};

/// Calendar gateway serving scripted responses in order and recording the
/// token each request carried.
#[derive(Default)]
pub struct MockCalendarGateway {
    responses: Mutex<VecDeque<Result<CreatedEvent>>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl MockCalendarGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<CreatedEvent>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.tokens_seen.lock().unwrap().len()
    }
}

pub fn created(id: &str) -> Result<CreatedEvent> {
    Ok(CreatedEvent {
        id: id.to_string(),
        html_link: Some(format!("https://calendar.google.com/event?eid={id}")),
    })
}

pub fn rejected(status: u16, body: &str) -> Result<CreatedEvent> {
    Err(SecrelyError::Booking { status, body: body.to_string() })
}

#[async_trait]
impl CalendarGateway for MockCalendarGateway {
    async fn create_event(
        &self,
        access_token: &str,
        _calendar_id: &str,
        _proposal: &MeetingProposal,
    ) -> Result<CreatedEvent> {
        self.tokens_seen.lock().unwrap().push(access_token.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SecrelyError::Internal("no scripted response".into())))
    }

    async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarSummary>> {
        self.tokens_seen.lock().unwrap().push(access_token.to_string());
        Ok(vec![CalendarSummary {
            id: "primary".into(),
            summary: "ana@example.com".into(),
            primary: true,
            access_role: Some("owner".into()),
        }])
    }
}

/// Token source handing out `token-0`, then `token-1` after each refresh.
#[derive(Default)]
pub struct CountingTokens {
    refreshes: AtomicUsize,
    fail_refresh: bool,
}

impl CountingTokens {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_refresh() -> Arc<Self> {
        Arc::new(Self { fail_refresh: true, ..Self::default() })
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenSource for CountingTokens {
    async fn access_token(&self) -> Result<String> {
        Ok(format!("token-{}", self.refreshes()))
    }

    async fn refresh(&self) -> Result<String> {
        if self.fail_refresh {
            return Err(SecrelyError::Refresh("consent declined".into()));
        }
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{n}"))
    }
}

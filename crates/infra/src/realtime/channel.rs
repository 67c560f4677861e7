//! Websocket push channel for meeting details produced by phone calls.
//!
//! The backend pushes `{"type": "meeting_details", "data": {...}}` once a
//! call transcript has been extracted. The channel opens after a short
//! delay, reconnects with a fixed delay whenever the socket drops, and
//! stops for good on [`teardown`](RealtimeResultChannel::teardown).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use parking_lot::Mutex;
use secrely_core::{ResultChannelHandle, ResultChannelOpener, ResultNotice};
use secrely_domain::{Config, MeetingProposal, RealtimeConfig, SecrelyError};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::timer::ReconnectTimer;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for one result channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub url: String,
    pub open_delay: Duration,
    pub reconnect_delay: Duration,
    /// 0 means unbounded.
    pub max_reconnect_attempts: u32,
}

impl ChannelSettings {
    pub fn new(url: impl Into<String>, realtime: &RealtimeConfig) -> Self {
        Self {
            url: url.into(),
            open_delay: Duration::from_millis(realtime.open_delay_ms),
            reconnect_delay: Duration::from_millis(realtime.reconnect_delay_ms),
            max_reconnect_attempts: realtime.max_reconnect_attempts,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.backend.realtime_url(), &config.realtime)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PushMessage {
    MeetingDetails {
        #[serde(default)]
        data: Value,
    },
    #[serde(other)]
    Unknown,
}

struct ChannelState {
    settings: ChannelSettings,
    notices: UnboundedSender<ResultNotice>,
    shutdown: CancellationToken,
    timer: ReconnectTimer,
    reader: Mutex<Option<JoinHandle<()>>>,
    failures: AtomicU32,
    connections: AtomicU32,
}

impl ChannelState {
    fn teardown(&self) {
        self.shutdown.cancel();
        self.timer.cancel();
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }

    fn schedule_connect(self: &Arc<Self>, delay: Duration) {
        self.timer.schedule(delay, connect(Arc::clone(self)));
    }

    /// Called whenever the socket is lost or a connection attempt fails.
    fn on_closed(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = self.settings.max_reconnect_attempts;
        if limit > 0 && failures > limit {
            warn!(attempts = limit, "Result channel gave up reconnecting");
            let _ = self.notices.send(ResultNotice::GaveUp(SecrelyError::Connection(format!(
                "result channel lost after {limit} reconnect attempts"
            ))));
            self.teardown();
            return;
        }
        debug!(
            delay_ms = self.settings.reconnect_delay.as_millis() as u64,
            "Result channel reconnect scheduled"
        );
        self.schedule_connect(self.settings.reconnect_delay);
    }

    fn on_text(&self, text: &str) {
        let message = match serde_json::from_str::<PushMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "Ignoring malformed result message");
                return;
            }
        };
        let PushMessage::MeetingDetails { data } = message else {
            debug!("Ignoring result message of unknown type");
            return;
        };
        match MeetingProposal::from_payload(&data) {
            Ok(Some(proposal)) => {
                info!(title = %proposal.title, "Meeting details pushed");
                if self.notices.send(ResultNotice::Meeting(proposal)).is_err() {
                    debug!("Result receiver dropped, closing channel");
                    self.teardown();
                }
            }
            Ok(None) => debug!("Meeting details message without data"),
            Err(err) => warn!(error = %err, "Ignoring unreadable meeting details"),
        }
    }
}

// Boxed so the reconnect path can name its own future type.
fn connect(state: Arc<ChannelState>) -> BoxFuture<'static, ()> {
    async move {
        let attempt = tokio::select! {
            biased;
            () = state.shutdown.cancelled() => return,
            attempt = connect_async(state.settings.url.as_str()) => attempt,
        };
        match attempt {
            Ok((socket, _response)) => {
                state.failures.store(0, Ordering::SeqCst);
                state.connections.fetch_add(1, Ordering::SeqCst);
                info!(url = %state.settings.url, "Result channel open");
                let reader = tokio::spawn(read(Arc::clone(&state), socket));
                let previous = state.reader.lock().replace(reader);
                if let Some(previous) = previous {
                    previous.abort();
                }
                // Teardown may have run while the reader was being stored.
                if state.shutdown.is_cancelled() {
                    state.teardown();
                }
            }
            Err(err) => {
                warn!(error = %err, "Result channel connection failed");
                state.on_closed();
            }
        }
    }
    .boxed()
}

async fn read(state: Arc<ChannelState>, mut socket: WsStream) {
    loop {
        tokio::select! {
            biased;
            () = state.shutdown.cancelled() => {
                let _ = socket.close(None).await;
                return;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => state.on_text(text.as_str()),
                Some(Ok(Message::Ping(payload))) => {
                    let _ = socket.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Result channel closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "Result channel error");
                    break;
                }
            },
        }
    }
    state.on_closed();
}

/// Live push channel for one placed call. Dropping it tears it down.
pub struct RealtimeResultChannel {
    state: Arc<ChannelState>,
}

impl RealtimeResultChannel {
    /// Schedules the first connection after the open delay. Must be called
    /// inside a tokio runtime.
    pub fn open(settings: ChannelSettings, notices: UnboundedSender<ResultNotice>) -> Self {
        let open_delay = settings.open_delay;
        let state = Arc::new(ChannelState {
            settings,
            notices,
            shutdown: CancellationToken::new(),
            timer: ReconnectTimer::new(),
            reader: Mutex::new(None),
            failures: AtomicU32::new(0),
            connections: AtomicU32::new(0),
        });
        state.schedule_connect(open_delay);
        Self { state }
    }

    /// Successful connections so far, reconnects included.
    pub fn connections(&self) -> u32 {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn reconnect_pending(&self) -> bool {
        self.state.timer.is_pending()
    }
}

impl ResultChannelHandle for RealtimeResultChannel {
    fn teardown(&self) {
        if !self.state.shutdown.is_cancelled() {
            debug!("Tearing down result channel");
        }
        self.state.teardown();
    }

    fn is_closed(&self) -> bool {
        self.state.shutdown.is_cancelled()
    }
}

impl Drop for RealtimeResultChannel {
    fn drop(&mut self) {
        self.state.teardown();
    }
}

/// [`ResultChannelOpener`] backed by the backend's websocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketResultChannelOpener {
    settings: ChannelSettings,
}

impl WebSocketResultChannelOpener {
    pub fn new(settings: ChannelSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ChannelSettings::from_config(config))
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }
}

impl ResultChannelOpener for WebSocketResultChannelOpener {
    fn open(&self, notices: UnboundedSender<ResultNotice>) -> Box<dyn ResultChannelHandle> {
        Box::new(RealtimeResultChannel::open(self.settings.clone(), notices))
    }
}

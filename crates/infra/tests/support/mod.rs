//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use secrely_domain::MeetingProposal;
use secrely_infra::HttpClient;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;

pub type ServerSocket = WebSocketStream<TcpStream>;

/// Local websocket server running a script per accepted connection.
pub struct WsServer {
    pub url: String,
    accepted: Arc<AtomicUsize>,
}

impl WsServer {
    /// Starts listening on an ephemeral port. `script` receives the
    /// zero-based connection index and the upgraded socket.
    pub async fn start<F, Fut>(script: F) -> Self
    where
        F: Fn(usize, ServerSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let script = Arc::new(script);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let script = Arc::clone(&script);
                tokio::spawn(async move {
                    if let Ok(socket) = tokio_tungstenite::accept_async(stream).await {
                        script(index, socket).await;
                    }
                });
            }
        });

        Self { url, accepted }
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Client with no retry backoff so failure paths stay fast.
pub fn fast_http() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(2)
        .base_backoff(Duration::from_millis(5))
        .build()
        .expect("http client")
}

pub fn proposal_json() -> Value {
    json!({
        "title": "Quarterly planning",
        "description": "Roadmap review",
        "startDateTime": "2025-03-04T10:00:00",
        "endDateTime": "2025-03-04T11:00:00",
        "attendees": [
            {"name": "Dana Smith", "email": "dana@example.com"},
            {"name": "Lee"}
        ],
        "timezone": "America/New_York"
    })
}

pub fn proposal() -> MeetingProposal {
    serde_json::from_value(proposal_json()).expect("valid proposal fixture")
}

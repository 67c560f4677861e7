//! Scheduling backend client: transcript extraction, outbound calls and
//! signed agent URLs.

use async_trait::async_trait;
use reqwest::{Method, Response};
use secrely_core::{CallInitiator, CallReceipt, CallRequest, ExtractionService};
use secrely_domain::{BackendConfig, MeetingProposal, Result, SecrelyError};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::types::{
    MeetingDetailsResponse, ProcessTextRequest, ProcessTextResponse, SignedUrlResponse,
};
use crate::errors::{http_status_error, InfraError};
use crate::http::HttpClient;

const PROCESS_TEXT_PATH: &str = "/api/process-text";
const CALL_PATH: &str = "/api/twilio/call";
const MEETING_DETAILS_PATH: &str = "/api/twilio/meeting-details";
const SIGNED_URL_PATH: &str = "/api/get-signed-url";

/// HTTP client of the scheduling backend.
#[derive(Clone)]
pub struct BackendClient {
    http: HttpClient,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url` (trailing slashes dropped)
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    /// Build the HTTP client from the backend section
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(http, config.base_url.clone()))
    }

    /// Normalised backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed websocket URL for a private voice agent.
    pub async fn get_signed_url(&self) -> Result<String> {
        let response = self
            .http
            .send(self.http.request(Method::GET, self.url(SIGNED_URL_PATH)))
            .await?;
        let body: SignedUrlResponse = read_json(response, "signed url").await?;
        body.signed_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SecrelyError::Connection("backend returned no signed URL".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ExtractionService for BackendClient {
    async fn extract(&self, transcript: &str) -> Result<Option<MeetingProposal>> {
        debug!(chars = transcript.len(), "Submitting transcript for extraction");
        let response = self
            .http
            .send(
                self.http
                    .request(Method::POST, self.url(PROCESS_TEXT_PATH))
                    .json(&ProcessTextRequest { text_input: transcript }),
            )
            .await?;
        let body: ProcessTextResponse = read_json(response, "extraction").await?;
        MeetingProposal::from_payload(&body.meeting)
    }
}

#[async_trait]
impl CallInitiator for BackendClient {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallReceipt> {
        let response = self
            .http
            .send(self.http.request(Method::POST, self.url(CALL_PATH)).json(request))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecrelyError::Connection(format!(
                "call initiation failed: HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let receipt: CallReceipt =
            response.json().await.map_err(|e| SecrelyError::from(InfraError::from(e)))?;
        info!(status = %receipt.status, call_sid = ?receipt.call_sid, "Call initiation answered");
        Ok(receipt)
    }

    async fn meeting_details(&self, call_sid: &str) -> Result<Option<MeetingProposal>> {
        let path = format!("{MEETING_DETAILS_PATH}/{}", urlencoding::encode(call_sid));
        let response =
            self.http.send(self.http.request(Method::GET, self.url(&path))).await?;
        let details: MeetingDetailsResponse = read_json(response, "meeting details").await?;

        if !details.success {
            debug!(call_sid, error = ?details.error, "No meeting details yet");
            return Ok(None);
        }
        if !details.has_form_data() {
            return Ok(None);
        }
        MeetingProposal::from_payload(&details.form_data).map_err(|err| {
            warn!(call_sid, error = %err, "Unusable meeting details");
            err
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(http_status_error(status, context));
    }
    response.json().await.map_err(|e| SecrelyError::from(InfraError::from(e)))
}

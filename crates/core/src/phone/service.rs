//! Outbound phone-call flow
//!
//! The browser is not a party to the call, so the proposal extracted by the
//! backend comes back over a result channel opened right after the call is
//! placed. The channel lives exactly as long as this service (or until the
//! next call replaces it).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use secrely_common::validate_phone_number;
use secrely_domain::constants::DEFAULT_HOST_NAME;
use secrely_domain::{AvailabilityWeek, MeetingProposal, Result, SecrelyError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ports::{
    CallInitiator, CallReceipt, CallRequest, ResultChannelHandle, ResultChannelOpener,
    ResultNotice,
};

pub struct PhoneCallService {
    initiator: Arc<dyn CallInitiator>,
    channels: Arc<dyn ResultChannelOpener>,
    host_name: String,
    host_email: Option<String>,
    channel: Mutex<Option<Box<dyn ResultChannelHandle>>>,
    notices: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<ResultNotice>>>,
    call_sid: Mutex<Option<String>>,
    proposal: RwLock<Option<MeetingProposal>>,
}

impl PhoneCallService {
    /// Create a phone call service
    pub fn new(initiator: Arc<dyn CallInitiator>, channels: Arc<dyn ResultChannelOpener>) -> Self {
        Self {
            initiator,
            channels,
            host_name: DEFAULT_HOST_NAME.to_string(),
            host_email: None,
            channel: Mutex::new(None),
            notices: tokio::sync::Mutex::new(None),
            call_sid: Mutex::new(None),
            proposal: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_host(mut self, name: impl Into<String>, email: Option<String>) -> Self {
        self.host_name = name.into();
        self.host_email = email;
        self
    }

    /// Asks the backend to call `phone_number` and opens the result channel.
    ///
    /// Any channel from a previous call is torn down first. A receipt whose
    /// status is not `success` fails with `Connection`.
    pub async fn place_call(
        &self,
        phone_number: &str,
        availability: &AvailabilityWeek,
    ) -> Result<CallReceipt> {
        let phone_number = validate_phone_number(phone_number)
            .map_err(|e| SecrelyError::InvalidInput(e.to_string()))?;
        if availability.is_empty() {
            return Err(SecrelyError::InvalidInput(
                "declare at least one available slot before placing a call".into(),
            ));
        }

        self.teardown();

        let request = CallRequest {
            phone_number,
            host_availability: availability.serialize(),
            host_email: self.host_email.clone(),
            host_name: self.host_name.clone(),
        };
        let receipt = self.initiator.initiate_call(&request).await?;
        if !receipt.is_success() {
            let detail = receipt.message.clone().unwrap_or_else(|| receipt.status.clone());
            warn!(status = %receipt.status, "Call initiation rejected");
            return Err(SecrelyError::Connection(format!("call initiation failed: {detail}")));
        }
        info!(call_sid = ?receipt.call_sid, "Call initiated");

        *self.call_sid.lock() = receipt.call_sid.clone();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        *self.notices.lock().await = Some(notices_rx);
        let handle = self.channels.open(notices_tx);
        *self.channel.lock() = Some(handle);

        Ok(receipt)
    }

    /// Waits up to `wait` for the next proposal pushed over the channel.
    ///
    /// When nothing arrives in time, asks the backend directly once.
    /// `Ok(None)` means no proposal is available yet.
    pub async fn next_proposal(&self, wait: Duration) -> Result<Option<MeetingProposal>> {
        let received = {
            let mut guard = self.notices.lock().await;
            let notices = guard
                .as_mut()
                .ok_or_else(|| SecrelyError::Connection("no call in progress".into()))?;
            match tokio::time::timeout(wait, notices.recv()).await {
                Ok(Some(ResultNotice::Meeting(proposal))) => Some(proposal),
                Ok(Some(ResultNotice::GaveUp(err))) => {
                    *guard = None;
                    return Err(err);
                }
                Ok(None) => {
                    *guard = None;
                    return Err(SecrelyError::Connection("result channel closed".into()));
                }
                Err(_) => None,
            }
        };

        match received {
            Some(proposal) => {
                info!(title = %proposal.title, "Meeting details received");
                *self.proposal.write() = Some(proposal.clone());
                Ok(Some(proposal))
            }
            None => self.poll_meeting_details().await,
        }
    }

    async fn poll_meeting_details(&self) -> Result<Option<MeetingProposal>> {
        let call_sid = self.call_sid.lock().clone();
        let Some(call_sid) = call_sid else {
            return Ok(None);
        };
        debug!(call_sid = %call_sid, "Polling meeting details");
        match self.initiator.meeting_details(&call_sid).await {
            Ok(Some(proposal)) => {
                *self.proposal.write() = Some(proposal.clone());
                Ok(Some(proposal))
            }
            Ok(None) | Err(SecrelyError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Latest proposal received during the call
    pub fn proposal(&self) -> Option<MeetingProposal> {
        self.proposal.read().clone()
    }

    pub fn discard_proposal(&self) -> Option<MeetingProposal> {
        self.proposal.write().take()
    }

    /// Call id returned when the call was placed
    pub fn call_sid(&self) -> Option<String> {
        self.call_sid.lock().clone()
    }

    pub fn has_open_channel(&self) -> bool {
        self.channel.lock().as_ref().is_some_and(|channel| !channel.is_closed())
    }

    /// Closes the result channel and cancels its pending reconnect.
    pub fn teardown(&self) {
        let channel = self.channel.lock().take();
        if let Some(channel) = channel {
            debug!("Tearing down result channel");
            channel.teardown();
        }
    }
}

impl Drop for PhoneCallService {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for PhoneCallService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneCallService")
            .field("call_sid", &self.call_sid())
            .field("channel_open", &self.has_open_channel())
            .finish_non_exhaustive()
    }
}

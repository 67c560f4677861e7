//! Port interfaces for the outbound phone-call flow

use async_trait::async_trait;
use secrely_domain::constants::CALL_STATUS_SUCCESS;
use secrely_domain::{MeetingProposal, Result, SecrelyError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Body of the call-initiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub phone_number: String,
    /// Serialized availability week, verbatim.
    pub host_availability: String,
    pub host_email: Option<String>,
    pub host_name: String,
}

/// What the backend said about the call it was asked to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
}

impl CallReceipt {
    pub fn is_success(&self) -> bool {
        self.status == CALL_STATUS_SUCCESS
    }
}

/// Telephony backend.
#[async_trait]
pub trait CallInitiator: Send + Sync {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallReceipt>;

    /// Polls for the proposal extracted from a finished call.
    async fn meeting_details(&self, call_sid: &str) -> Result<Option<MeetingProposal>>;
}

/// Pushed by a result channel to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultNotice {
    Meeting(MeetingProposal),
    /// The channel stopped reconnecting; nothing more will arrive.
    GaveUp(SecrelyError),
}

/// Owner's handle on an open result channel.
pub trait ResultChannelHandle: Send + Sync {
    /// Closes the connection and cancels any pending reconnect before
    /// returning.
    fn teardown(&self);

    fn is_closed(&self) -> bool;
}

/// Opens result channels for placed calls.
pub trait ResultChannelOpener: Send + Sync {
    /// Starts a channel delivering notices on `notices`. Must be called from
    /// within a tokio runtime.
    fn open(&self, notices: UnboundedSender<ResultNotice>) -> Box<dyn ResultChannelHandle>;
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrely_core::{
    CallInitiator, CallReceipt, CallRequest, ResultChannelHandle, ResultChannelOpener,
    ResultNotice,
};
use secrely_domain::{MeetingProposal, Result};
use tokio::sync::mpsc::UnboundedSender;

/// Telephony backend that accepts or rejects every call.
pub struct MockCallInitiator {
    receipt: CallReceipt,
    requests: Mutex<Vec<CallRequest>>,
    details: Mutex<Option<MeetingProposal>>,
    polls: AtomicUsize,
}

impl MockCallInitiator {
    pub fn accepting(call_sid: &str) -> Arc<Self> {
        Self::with_receipt(CallReceipt {
            status: "success".into(),
            message: None,
            call_sid: Some(call_sid.to_string()),
        })
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Self::with_receipt(CallReceipt {
            status: "error".into(),
            message: Some(message.to_string()),
            call_sid: None,
        })
    }

    fn with_receipt(receipt: CallReceipt) -> Arc<Self> {
        Arc::new(Self {
            receipt,
            requests: Mutex::new(Vec::new()),
            details: Mutex::new(None),
            polls: AtomicUsize::new(0),
        })
    }

    pub fn set_details(&self, proposal: MeetingProposal) {
        *self.details.lock().unwrap() = Some(proposal);
    }

    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallInitiator for MockCallInitiator {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallReceipt> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.receipt.clone())
    }

    async fn meeting_details(&self, _call_sid: &str) -> Result<Option<MeetingProposal>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.details.lock().unwrap().clone())
    }
}

/// Channel handle recording teardown.
pub struct MockChannelHandle {
    closed: Arc<AtomicBool>,
}

impl ResultChannelHandle for MockChannelHandle {
    fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Opener that hands the notice sender to the test.
#[derive(Default)]
pub struct MockChannelOpener {
    opened: Mutex<Vec<(UnboundedSender<ResultNotice>, Arc<AtomicBool>)>>,
}

impl MockChannelOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Pushes a notice on the most recently opened channel.
    pub fn push(&self, notice: ResultNotice) {
        if let Some((sender, _)) = self.opened.lock().unwrap().last() {
            let _ = sender.send(notice);
        }
    }

    pub fn is_torn_down(&self, index: usize) -> bool {
        self.opened.lock().unwrap()[index].1.load(Ordering::SeqCst)
    }
}

impl ResultChannelOpener for MockChannelOpener {
    fn open(&self, notices: UnboundedSender<ResultNotice>) -> Box<dyn ResultChannelHandle> {
        let closed = Arc::new(AtomicBool::new(false));
        self.opened.lock().unwrap().push((notices, Arc::clone(&closed)));
        Box::new(MockChannelHandle { closed })
    }
}

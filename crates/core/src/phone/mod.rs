//! Outbound phone-call scheduling

pub mod ports;
pub mod service;

pub use ports::{
    CallInitiator, CallReceipt, CallRequest, ResultChannelHandle, ResultChannelOpener,
    ResultNotice,
};
pub use service::PhoneCallService;

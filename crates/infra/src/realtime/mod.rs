//! Realtime push of call results

pub mod channel;
pub mod timer;

pub use channel::{ChannelSettings, RealtimeResultChannel, WebSocketResultChannelOpener};
pub use timer::ReconnectTimer;

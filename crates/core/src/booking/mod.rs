//! Calendar booking

pub mod ports;
pub mod service;

pub use ports::{AccessTokenSource, CalendarGateway, CalendarSummary, CreatedEvent};
pub use service::BookingService;

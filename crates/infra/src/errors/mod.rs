//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{http_status_error, InfraError};

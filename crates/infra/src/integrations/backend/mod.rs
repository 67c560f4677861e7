//! Scheduling backend integration

pub mod client;
pub mod types;

pub use client::BackendClient;

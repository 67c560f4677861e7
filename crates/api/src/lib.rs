//! # Secrely
//!
//! Command-line front end for the scheduling assistant: sign in to Google
//! Calendar, talk to the scheduling agent, have it phone someone, and book
//! the meeting it negotiates.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod context;
pub mod utils;

pub use cli::Cli;
pub use context::{AppContext, AppPorts};

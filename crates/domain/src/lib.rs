//! # Secrely Domain
//!
//! Business domain types and models for Secrely.
//!
//! This crate contains:
//! - The weekly availability model and its agent-facing serialization
//! - Transcript events, sessions and meeting proposals
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Date coercion helpers used before booking
//!
//! ## Architecture
//! - No dependencies on other Secrely crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::datetime::{ensure_iso_format, resolve_timezone};

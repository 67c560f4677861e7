//! Terminal adapters for core ports

pub mod console;

pub use console::{prompt_line, ConsoleMediaAccess};

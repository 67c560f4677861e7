//! Configuration loading
//!
//! Sources, in order: `SECRELY_*` environment variables, a `secrely.toml`
//! (or JSON) file found near the working directory, built-in defaults.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};

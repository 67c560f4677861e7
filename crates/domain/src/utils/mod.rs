//! Domain utility functions

pub mod datetime;

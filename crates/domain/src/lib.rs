//! Shared types for the sksession crates: the error type, configuration,
//! and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

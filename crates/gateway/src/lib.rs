//! HTTP front end for sksession: axum middleware and extractor around the
//! session hook, demo routes, and the `sksessiond` CLI.

pub mod api;
pub mod cli;
pub mod state;
pub mod transport;

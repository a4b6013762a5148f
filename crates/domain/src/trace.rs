use serde::Serialize;

/// Structured trace events emitted across all sksession crates.
///
/// Identifiers are secrets: events only ever carry [`id_hint`] output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        id_hint: String,
        is_new: bool,
    },
    SessionLoaded {
        id_hint: String,
        keys: usize,
    },
    SessionSaved {
        id_hint: String,
        bytes: usize,
    },
    SessionDestroyed {
        backend: String,
        id_hint: String,
    },
    SessionsCollected {
        backend: String,
        removed: usize,
    },
    SignalsApplied {
        cookies: usize,
        headers: usize,
    },
    StorageFailure {
        backend: String,
        operation: String,
        error: String,
    },
    ForwardCycle {
        topic: String,
        target: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sk_event");
    }
}

/// First few characters of an identifier, safe to log.
pub fn id_hint(identifier: &str) -> String {
    let prefix: String = identifier.chars().take(6).collect();
    format!("{prefix}…")
}

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of something that publishes or receives signals.
///
/// Handles are allocated from a process-wide counter and never reused, so
/// two components only match when they were handed the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(u64);

static NEXT_TARGET: AtomicU64 = AtomicU64::new(1);

impl TargetId {
    /// Allocate a fresh handle.
    pub fn next() -> Self {
        Self(NEXT_TARGET.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

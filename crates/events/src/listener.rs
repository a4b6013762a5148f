use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::signal::Signal;
use crate::target::TargetId;

type RunnerFn = dyn Fn(&str, TargetId, &Signal) + Send + Sync;

/// Identity of a runner's behaviour.  Clones of a [`Runner`] share it, which
/// is what the bus compares when collapsing duplicate subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunnerId(u64);

static NEXT_RUNNER: AtomicU64 = AtomicU64::new(1);

/// Callback invoked with `(event name, source target, payload)`.
#[derive(Clone)]
pub struct Runner {
    id: RunnerId,
    f: Arc<RunnerFn>,
}

impl Runner {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, TargetId, &Signal) + Send + Sync + 'static,
    {
        Self {
            id: RunnerId(NEXT_RUNNER.fetch_add(1, Ordering::Relaxed)),
            f: Arc::new(f),
        }
    }

    pub fn id(&self) -> RunnerId {
        self.id
    }

    pub(crate) fn call(&self, event: &str, source: TargetId, signal: &Signal) {
        (self.f)(event, source, signal)
    }
}

impl PartialEq for Runner {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Runner {}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Runner").field(&self.id.0).finish()
    }
}

/// What a registered listener does when it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Run(Runner),
    /// Re-publish the same event and payload under another target.
    Forward(TargetId),
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) event: String,
    pub(crate) target: TargetId,
    pub(crate) action: Action,
}

impl Listener {
    pub(crate) fn matches(&self, event: &str, target: TargetId) -> bool {
        self.target == target && self.event == event
    }

    pub(crate) fn same_as(&self, event: &str, target: TargetId, action: &Action) -> bool {
        self.matches(event, target) && &self.action == action
    }
}

/// A listener to attach for the duration of [`run_scoped`](crate::run_scoped).
#[derive(Debug, Clone)]
pub struct ListenerSpec {
    pub event: String,
    pub of: TargetId,
    pub runner: Runner,
}

impl ListenerSpec {
    pub fn new(event: impl Into<String>, of: TargetId, runner: Runner) -> Self {
        Self {
            event: event.into(),
            of,
            runner,
        }
    }
}

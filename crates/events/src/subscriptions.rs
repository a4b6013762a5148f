use std::sync::Arc;

use crate::bus::Dispatcher;
use crate::listener::Runner;
use crate::target::TargetId;

#[derive(Debug)]
enum Entry {
    Listen {
        event: String,
        target: TargetId,
        runner: Runner,
    },
    Forward {
        event: String,
        from: TargetId,
        to: TargetId,
    },
}

/// Subscriptions and forwards owned by one holder, removed from the bus when
/// the set is dropped.
///
/// Per-request wiring lives in one of these so that nothing registered for
/// a request outlives it on a long-lived bus.
pub struct SubscriptionSet {
    bus: Arc<dyn Dispatcher>,
    entries: Vec<Entry>,
}

impl SubscriptionSet {
    pub fn new(bus: Arc<dyn Dispatcher>) -> Self {
        Self {
            bus,
            entries: Vec::new(),
        }
    }

    pub fn bus(&self) -> &Arc<dyn Dispatcher> {
        &self.bus
    }

    pub fn subscribe(&mut self, event: &str, target: TargetId, runner: Runner) {
        self.bus.subscribe(event, target, runner.clone());
        self.entries.push(Entry::Listen {
            event: event.to_owned(),
            target,
            runner,
        });
    }

    pub fn forward(&mut self, event: &str, from: TargetId, to: TargetId) {
        self.bus.forward(event, from, to);
        self.entries.push(Entry::Forward {
            event: event.to_owned(),
            from,
            to,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        for entry in self.entries.drain(..) {
            match entry {
                Entry::Listen {
                    event,
                    target,
                    runner,
                } => self.bus.unsubscribe(&event, target, &runner),
                Entry::Forward { event, from, to } => self.bus.unforward(&event, from, to),
            }
        }
    }
}

//! Several buses behind one [`Dispatcher`].
//!
//! A component that owns a private bus can be merged into a shared one
//! without knowing about it: subscriptions, forwards and publishes fan out
//! to every member.  Scoped listening attaches to the first member only,
//! since every member receives identical subscribe/unsubscribe calls.

use std::sync::Arc;

use crate::bus::Dispatcher;
use crate::listener::Runner;
use crate::signal::Signal;
use crate::target::TargetId;

#[derive(Default)]
pub struct BusFederation {
    members: Vec<Arc<dyn Dispatcher>>,
}

impl BusFederation {
    pub fn new(members: Vec<Arc<dyn Dispatcher>>) -> Self {
        Self { members }
    }

    /// Add another member bus.
    pub fn chain(mut self, member: Arc<dyn Dispatcher>) -> Self {
        self.members.push(member);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Dispatcher for BusFederation {
    fn subscribe(&self, event: &str, target: TargetId, runner: Runner) {
        for member in &self.members {
            member.subscribe(event, target, runner.clone());
        }
    }

    fn unsubscribe(&self, event: &str, target: TargetId, runner: &Runner) {
        for member in &self.members {
            member.unsubscribe(event, target, runner);
        }
    }

    fn publish(&self, event: &str, source: TargetId, signal: &Signal) {
        for member in &self.members {
            member.publish(event, source, signal);
        }
    }

    fn forward(&self, event: &str, from: TargetId, to: TargetId) {
        for member in &self.members {
            member.forward(event, from, to);
        }
    }

    fn unforward(&self, event: &str, from: TargetId, to: TargetId) {
        for member in &self.members {
            member.unforward(event, from, to);
        }
    }

    fn scope_member(&self) -> &dyn Dispatcher {
        match self.members.first() {
            Some(member) => member.scope_member(),
            None => self,
        }
    }
}

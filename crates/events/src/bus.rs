//! Listener registry keyed on `(event name, target)`.
//!
//! Dispatch is synchronous and in registration order.  Matching listeners are
//! snapshotted before any of them runs, so a runner may publish, subscribe or
//! unsubscribe on the same bus without deadlocking.  Panics raised by a
//! runner are not caught; they unwind into the publisher.

use parking_lot::RwLock;

use sk_domain::trace::TraceEvent;

use crate::listener::{Action, Listener, Runner};
use crate::signal::Signal;
use crate::target::TargetId;

/// The contract shared by [`EventBus`] and
/// [`BusFederation`](crate::BusFederation).
pub trait Dispatcher: Send + Sync {
    /// Register `runner` for `event` raised by `target`.  Registering a
    /// runner that is already present for the same pair is a no-op.
    fn subscribe(&self, event: &str, target: TargetId, runner: Runner);

    /// Remove `runner` for `event` raised by `target`.  Unknown runners are
    /// ignored.
    fn unsubscribe(&self, event: &str, target: TargetId, runner: &Runner);

    /// Invoke every listener registered for `(event, source)`.
    fn publish(&self, event: &str, source: TargetId, signal: &Signal);

    /// Re-publish `event` raised by `from` as if `to` had raised it.
    fn forward(&self, event: &str, from: TargetId, to: TargetId);

    /// Remove a rule added by [`forward`](Self::forward).
    fn unforward(&self, event: &str, from: TargetId, to: TargetId);

    /// The bus that scoped listeners attach to.
    fn scope_member(&self) -> &dyn Dispatcher;
}

/// In-process signal bus.
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered listeners, forwards included.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn insert(&self, event: &str, target: TargetId, action: Action) {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| l.same_as(event, target, &action)) {
            return;
        }
        listeners.push(Listener {
            event: event.to_owned(),
            target,
            action,
        });
    }

    fn remove(&self, event: &str, target: TargetId, action: &Action) {
        self.listeners
            .write()
            .retain(|l| !l.same_as(event, target, action));
    }

    fn dispatch(&self, event: &str, source: TargetId, signal: &Signal, trail: &mut Vec<TargetId>) {
        if trail.contains(&source) {
            TraceEvent::ForwardCycle {
                topic: event.to_owned(),
                target: source.get(),
            }
            .emit();
            return;
        }

        let matched: Vec<Action> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.matches(event, source))
            .map(|l| l.action.clone())
            .collect();
        if matched.is_empty() {
            return;
        }

        trail.push(source);
        for action in matched {
            match action {
                Action::Run(runner) => runner.call(event, source, signal),
                Action::Forward(to) => self.dispatch(event, to, signal, trail),
            }
        }
        trail.pop();
    }
}

impl Dispatcher for EventBus {
    fn subscribe(&self, event: &str, target: TargetId, runner: Runner) {
        self.insert(event, target, Action::Run(runner));
    }

    fn unsubscribe(&self, event: &str, target: TargetId, runner: &Runner) {
        self.remove(event, target, &Action::Run(runner.clone()));
    }

    fn publish(&self, event: &str, source: TargetId, signal: &Signal) {
        self.dispatch(event, source, signal, &mut Vec::new());
    }

    fn forward(&self, event: &str, from: TargetId, to: TargetId) {
        self.insert(event, from, Action::Forward(to));
    }

    fn unforward(&self, event: &str, from: TargetId, to: TargetId) {
        self.remove(event, from, &Action::Forward(to));
    }

    fn scope_member(&self) -> &dyn Dispatcher {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::signal::{topics, DestroySignal, HeaderSignal};

    fn header(data: &str) -> Signal {
        Signal::Header(HeaderSignal {
            identifier: "x-test".into(),
            data: data.into(),
        })
    }

    /// A runner that records `(source, data)` of every header signal.
    fn recorder() -> (Runner, Arc<Mutex<Vec<(TargetId, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let runner = Runner::new(move |_, source, signal| {
            if let Signal::Header(h) = signal {
                sink.lock().push((source, h.data.clone()));
            }
        });
        (runner, seen)
    }

    #[test]
    fn publish_reaches_matching_target_only() {
        let bus = EventBus::new();
        let a = TargetId::next();
        let b = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, a, runner);

        bus.publish(topics::SET_HEADER, b, &header("other"));
        bus.publish(topics::SET_COOKIE, a, &header("wrong event"));
        bus.publish(topics::SET_HEADER, a, &header("mine"));

        assert_eq!(*seen.lock(), vec![(a, "mine".to_string())]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            bus.subscribe(
                topics::SET_HEADER,
                target,
                Runner::new(move |_, _, _| order.lock().push(n)),
            );
        }
        bus.publish(topics::SET_HEADER, target, &header("x"));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_subscription_dispatches_once() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, target, runner.clone());
        bus.subscribe(topics::SET_HEADER, target, runner);

        bus.publish(topics::SET_HEADER, target, &header("once"));

        assert_eq!(bus.listener_count(), 1);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_runner() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (kept, kept_seen) = recorder();
        let (dropped, dropped_seen) = recorder();
        bus.subscribe(topics::SET_HEADER, target, kept);
        bus.subscribe(topics::SET_HEADER, target, dropped.clone());

        bus.unsubscribe(topics::SET_HEADER, target, &dropped);
        bus.publish(topics::SET_HEADER, target, &header("x"));

        assert_eq!(kept_seen.lock().len(), 1);
        assert!(dropped_seen.lock().is_empty());
    }

    #[test]
    fn unsubscribe_unknown_and_publish_without_listeners_are_noops() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (runner, _) = recorder();
        bus.unsubscribe(topics::SET_HEADER, target, &runner);
        bus.publish(topics::DESTROY, target, &Signal::Destroy(DestroySignal {
            identifier: "gone".into(),
        }));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn forward_republishes_under_destination() {
        let bus = EventBus::new();
        let storage = TargetId::next();
        let session = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, session, runner);
        bus.forward(topics::SET_HEADER, storage, session);

        bus.publish(topics::SET_HEADER, storage, &header("from storage"));

        assert_eq!(*seen.lock(), vec![(session, "from storage".to_string())]);
    }

    #[test]
    fn forwards_chain_and_collapse() {
        let bus = EventBus::new();
        let storage = TargetId::next();
        let exchanger = TargetId::next();
        let session = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, session, runner);
        bus.forward(topics::SET_HEADER, storage, exchanger);
        bus.forward(topics::SET_HEADER, exchanger, session);
        bus.forward(topics::SET_HEADER, exchanger, session);

        bus.publish(topics::SET_HEADER, storage, &header("chained"));

        assert_eq!(bus.listener_count(), 3);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn unforward_stops_forwarding() {
        let bus = EventBus::new();
        let from = TargetId::next();
        let to = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, to, runner);
        bus.forward(topics::SET_HEADER, from, to);
        bus.unforward(topics::SET_HEADER, from, to);

        bus.publish(topics::SET_HEADER, from, &header("x"));

        assert!(seen.lock().is_empty());
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn forward_cycle_terminates() {
        let bus = EventBus::new();
        let a = TargetId::next();
        let b = TargetId::next();
        let (runner, seen) = recorder();
        bus.subscribe(topics::SET_HEADER, b, runner);
        bus.forward(topics::SET_HEADER, a, b);
        bus.forward(topics::SET_HEADER, b, a);

        bus.publish(topics::SET_HEADER, a, &header("loop"));

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn runner_may_reenter_the_bus() {
        let bus = Arc::new(EventBus::new());
        let target = TargetId::next();
        let inner = bus.clone();
        bus.subscribe(
            topics::SET_HEADER,
            target,
            Runner::new(move |_, _, _| {
                inner.subscribe(topics::SET_COOKIE, target, Runner::new(|_, _, _| {}));
            }),
        );
        bus.publish(topics::SET_HEADER, target, &header("x"));
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    #[should_panic(expected = "runner failed")]
    fn runner_panics_reach_the_publisher() {
        let bus = EventBus::new();
        let target = TargetId::next();
        bus.subscribe(
            topics::SET_HEADER,
            target,
            Runner::new(|_, _, _| panic!("runner failed")),
        );
        bus.publish(topics::SET_HEADER, target, &header("x"));
    }
}

use std::future::Future;

use crate::bus::Dispatcher;
use crate::listener::ListenerSpec;

/// Subscribe `listeners`, run `body`, then unsubscribe them again.
///
/// Detachment happens in a drop guard, so it also runs when `body` returns
/// an error, panics, or the returned future is dropped before completion.
/// On a [`BusFederation`](crate::BusFederation) the listeners attach to a
/// single member.
pub async fn run_scoped<D, F, T>(bus: &D, listeners: &[ListenerSpec], body: F) -> T
where
    D: Dispatcher + ?Sized,
    F: Future<Output = T>,
{
    let _guard = ScopeGuard::attach(bus.scope_member(), listeners);
    body.await
}

struct ScopeGuard<'a> {
    bus: &'a dyn Dispatcher,
    listeners: &'a [ListenerSpec],
}

impl<'a> ScopeGuard<'a> {
    fn attach(bus: &'a dyn Dispatcher, listeners: &'a [ListenerSpec]) -> Self {
        for l in listeners {
            bus.subscribe(&l.event, l.of, l.runner.clone());
        }
        Self { bus, listeners }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        for l in self.listeners {
            self.bus.unsubscribe(&l.event, l.of, &l.runner);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::bus::EventBus;
    use crate::listener::Runner;
    use crate::signal::{topics, CookieSignal, Signal};
    use crate::target::TargetId;

    fn cookie(data: &str) -> Signal {
        Signal::Cookie(CookieSignal {
            identifier: "SKSESSID".into(),
            data: data.into(),
            options: None,
        })
    }

    fn collector(target: TargetId) -> (ListenerSpec, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let runner = Runner::new(move |_, _, signal| {
            if let Signal::Cookie(c) = signal {
                sink.lock().push(c.data.clone());
            }
        });
        (ListenerSpec::new(topics::SET_COOKIE, target, runner), seen)
    }

    #[tokio::test]
    async fn listeners_live_only_inside_the_body() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (spec, seen) = collector(target);

        bus.publish(topics::SET_COOKIE, target, &cookie("before"));
        let out = run_scoped(&bus, &[spec], async {
            bus.publish(topics::SET_COOKIE, target, &cookie("during"));
            42
        })
        .await;
        bus.publish(topics::SET_COOKIE, target, &cookie("after"));

        assert_eq!(out, 42);
        assert_eq!(*seen.lock(), vec!["during".to_string()]);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn failing_body_still_detaches() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (spec, _) = collector(target);

        let out: Result<(), String> =
            run_scoped(&bus, &[spec], async { Err("load failed".to_string()) }).await;
        assert!(out.is_err());
        assert_eq!(bus.listener_count(), 0);

        // A later scope for the same pair must not see emissions made
        // outside any scope.
        bus.publish(topics::SET_COOKIE, target, &cookie("stray"));
        let (spec, seen) = collector(target);
        run_scoped(&bus, &[spec], async {
            bus.publish(topics::SET_COOKIE, target, &cookie("second"));
        })
        .await;
        assert_eq!(*seen.lock(), vec!["second".to_string()]);
    }

    #[tokio::test]
    async fn panicking_body_still_detaches() {
        let bus = Arc::new(EventBus::new());
        let target = TargetId::next();
        let (spec, _) = collector(target);

        let task_bus = bus.clone();
        let joined = tokio::spawn(async move {
            run_scoped(&*task_bus, &[spec], async {
                panic!("handler blew up");
            })
            .await
        })
        .await;

        assert!(joined.is_err());
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn body_may_suspend() {
        let bus = EventBus::new();
        let target = TargetId::next();
        let (spec, seen) = collector(target);

        run_scoped(&bus, &[spec], async {
            tokio::task::yield_now().await;
            bus.publish(topics::SET_COOKIE, target, &cookie("late"));
        })
        .await;

        assert_eq!(seen.lock().len(), 1);
    }
}

//! Per-module event bus.
//!
//! Listeners are kept per event kind in registration order and run
//! synchronously on `post`. A failing listener (error or panic) is reported
//! to the bus's interceptor and recorded in the outcome; delivery continues
//! with the next listener. The bus never retries.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use modhost_core::{BusError, EventKind, InvocationError, LifecycleEvent, ListenerFailure};
use tracing::{debug, trace, warn};

use crate::binding::ListenerBinding;
use crate::filter::KindFilter;
use crate::interceptor::ErrorInterceptor;
use crate::outcome::{DispatchOutcome, ListenerReport, ListenerStatus};

type KindMap = HashMap<EventKind, Vec<ListenerBinding>>;

/// Marker into the registration history, used to undo a batch of registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

pub struct EventBus {
    listeners: KindMap,
    /// Kind of every registration, in order; lets `rollback` pop exactly what was added.
    history: Vec<EventKind>,
    filter: KindFilter,
    interceptor: Arc<dyn ErrorInterceptor>,
}

impl EventBus {
    pub fn new(interceptor: Arc<dyn ErrorInterceptor>, filter: KindFilter) -> Self {
        Self { listeners: HashMap::new(), history: Vec::new(), filter, interceptor }
    }

    pub fn filter(&self) -> &KindFilter {
        &self.filter
    }

    pub fn accepts(&self, kind: &EventKind) -> bool {
        self.filter.accepts(kind)
    }

    /// Append a binding to its kind's list. Duplicates are kept.
    pub fn register(&mut self, binding: ListenerBinding) -> Result<(), BusError> {
        if !self.filter.accepts(binding.kind()) {
            return Err(BusError::KindRejected { kind: binding.kind().clone() });
        }
        debug!(listener = %binding.name(), kind = %binding.kind(), "Registered listener");
        self.history.push(binding.kind().clone());
        self.listeners.entry(binding.kind().clone()).or_default().push(binding);
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.history.len())
    }

    /// Drop every binding registered after `checkpoint`, restoring the listener table.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.history.len() > checkpoint.0 {
            let Some(kind) = self.history.pop() else { break };
            if let Some(list) = self.listeners.get_mut(&kind) {
                list.pop();
                if list.is_empty() {
                    self.listeners.remove(&kind);
                }
            }
        }
    }

    pub fn listeners(&self, kind: &EventKind) -> &[ListenerBinding] {
        self.listeners.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.listeners(kind).len()
    }

    pub fn total_listeners(&self) -> usize {
        self.history.len()
    }

    /// Deliver `event` to every listener registered for its kind, in order.
    pub fn post(&self, event: &LifecycleEvent) -> Result<DispatchOutcome, BusError> {
        if !self.filter.accepts(&event.kind) {
            return Err(BusError::KindRejected { kind: event.kind.clone() });
        }

        let chain = self.listeners(&event.kind);
        let mut outcome = DispatchOutcome::new(event.kind.clone());
        for (index, listener) in chain.iter().enumerate() {
            trace!(listener = %listener.name(), kind = %event.kind, "Invoking listener");
            let status = match listener.invoke(event) {
                Ok(()) => ListenerStatus::Completed,
                Err(cause) => {
                    self.report_failure(event, index, chain, &cause);
                    outcome.failures.push(ListenerFailure {
                        index,
                        listener: listener.name().to_string(),
                        cause,
                    });
                    ListenerStatus::Failed
                }
            };
            outcome.reports.push(ListenerReport {
                index,
                listener: listener.name().to_string(),
                status,
            });
        }

        debug!(
            kind = %event.kind,
            invoked = outcome.invoked(),
            failed = outcome.failures.len(),
            "Posted event"
        );
        Ok(outcome)
    }
}

impl EventBus {
    /// A panicking interceptor is logged and otherwise ignored.
    fn report_failure(
        &self,
        event: &LifecycleEvent,
        index: usize,
        chain: &[ListenerBinding],
        cause: &InvocationError,
    ) {
        let reported = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.interceptor.on_listener_failed(event, index, chain, cause)
        }));
        if let Err(payload) = reported {
            warn!(
                listener = %chain[index].name(),
                kind = %event.kind,
                error = %InvocationError::from_panic(payload),
                "Error interceptor panicked"
            );
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("filter", &self.filter)
            .field("listeners", &self.history.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<String>>>;
    type Intercepted = Arc<Mutex<Vec<(usize, usize, String)>>>;

    fn bus_with_log() -> (EventBus, Intercepted) {
        let log: Intercepted = Arc::default();
        let sink = Arc::clone(&log);
        let interceptor = move |_: &LifecycleEvent,
                                index: usize,
                                listeners: &[ListenerBinding],
                                cause: &InvocationError| {
            sink.lock().unwrap().push((index, listeners.len(), cause.to_string()));
        };
        (EventBus::new(Arc::new(interceptor), KindFilter::default()), log)
    }

    fn recorder(seen: Seen, name: &'static str) -> impl Fn(&LifecycleEvent) -> anyhow::Result<()> {
        move |_| {
            seen.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn empty_bus_posts_successfully() {
        let (bus, log) = bus_with_log();
        let outcome = bus.post(&LifecycleEvent::stage(modhost_core::LoadingStage::Complete)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.invoked(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn delivers_in_registration_order() {
        let (mut bus, _) = bus_with_log();
        let seen: Seen = Arc::default();
        for name in ["a", "b", "c", "d"] {
            bus.register(ListenerBinding::new(name, EventKind::CommonSetup, recorder(Arc::clone(&seen), name)))
                .unwrap();
        }
        let event = LifecycleEvent::new(EventKind::CommonSetup, serde_json::Value::Null);
        for _ in 0..3 {
            bus.post(&event).unwrap();
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["a", "b", "c", "d", "a", "b", "c", "d", "a", "b", "c", "d"]);
    }

    #[test]
    fn failing_listener_does_not_stop_the_rest() {
        let (mut bus, log) = bus_with_log();
        let seen: Seen = Arc::default();
        bus.register(ListenerBinding::new("first", EventKind::CommonSetup, recorder(Arc::clone(&seen), "first")))
            .unwrap();
        bus.register(ListenerBinding::new("second", EventKind::CommonSetup, |_| {
            Err(anyhow!("second is broken"))
        }))
        .unwrap();
        bus.register(ListenerBinding::new("third", EventKind::CommonSetup, recorder(Arc::clone(&seen), "third")))
            .unwrap();

        let outcome = bus.post(&LifecycleEvent::new(EventKind::CommonSetup, serde_json::Value::Null)).unwrap();
        assert_eq!(outcome.invoked(), 3);
        assert_eq!(outcome.failed_listeners(), vec!["second"]);
        assert_eq!(outcome.reports[1].status, ListenerStatus::Failed);
        assert_eq!(seen.lock().unwrap().as_slice(), ["first", "third"]);
        assert_eq!(log.lock().unwrap().as_slice(), [(1, 3, "second is broken".to_string())]);

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.first.listener, "second");
        assert!(err.additional.is_empty());
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let (mut bus, log) = bus_with_log();
        let seen: Seen = Arc::default();
        bus.register(ListenerBinding::new("boom", EventKind::Done, |_| panic!("listener exploded")))
            .unwrap();
        bus.register(ListenerBinding::new("after", EventKind::Done, recorder(Arc::clone(&seen), "after")))
            .unwrap();

        let outcome = bus.post(&LifecycleEvent::new(EventKind::Done, serde_json::Value::Null)).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["after"]);
        assert!(outcome.failures[0].cause.is_panic());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_interceptor_does_not_abort_dispatch() {
        struct Exploding;
        impl ErrorInterceptor for Exploding {
            fn on_listener_failed(&self, _: &LifecycleEvent, _: usize, _: &[ListenerBinding], _: &InvocationError) {
                panic!("interceptor exploded");
            }
        }
        let mut bus = EventBus::new(Arc::new(Exploding), KindFilter::default());
        let seen: Seen = Arc::default();
        bus.register(ListenerBinding::new("bad", EventKind::Complete, |_| Err(anyhow!("bad listener"))))
            .unwrap();
        bus.register(ListenerBinding::new("good", EventKind::Complete, recorder(Arc::clone(&seen), "good")))
            .unwrap();

        let outcome = bus.post(&LifecycleEvent::stage(modhost_core::LoadingStage::Complete)).unwrap();
        assert_eq!(outcome.failed_listeners(), vec!["bad"]);
        assert_eq!(seen.lock().unwrap().as_slice(), ["good"]);
    }

    #[test]
    fn every_failure_is_reported() {
        let (mut bus, _) = bus_with_log();
        for name in ["x", "y"] {
            bus.register(ListenerBinding::new(name, EventKind::Complete, move |_| Err(anyhow!("{name} failed"))))
                .unwrap();
        }
        let outcome = bus.post(&LifecycleEvent::new(EventKind::Complete, serde_json::Value::Null)).unwrap();
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.first.listener, "x");
        assert_eq!(err.additional.len(), 1);
        assert_eq!(err.failures().count(), 2);
    }

    #[test]
    fn other_kinds_are_not_invoked() {
        let (mut bus, _) = bus_with_log();
        let seen: Seen = Arc::default();
        bus.register(ListenerBinding::new("setup", EventKind::CommonSetup, recorder(Arc::clone(&seen), "setup")))
            .unwrap();
        let outcome = bus.post(&LifecycleEvent::new(EventKind::Complete, serde_json::Value::Null)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.invoked(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn duplicate_registrations_run_twice() {
        let (mut bus, _) = bus_with_log();
        let seen: Seen = Arc::default();
        let binding = ListenerBinding::new("dup", EventKind::Complete, recorder(Arc::clone(&seen), "dup"));
        bus.register(binding.clone()).unwrap();
        bus.register(binding).unwrap();
        bus.post(&LifecycleEvent::new(EventKind::Complete, serde_json::Value::Null)).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn filter_rejects_registration_and_post() {
        let (mut bus, _) = bus_with_log();
        let tick = EventKind::Custom("tick".into());
        let err = bus.register(ListenerBinding::new("t", tick.clone(), |_| Ok(()))).unwrap_err();
        assert!(matches!(err, BusError::KindRejected { .. }));
        assert!(bus.post(&LifecycleEvent::custom("tick", serde_json::Value::Null)).is_err());
        assert_eq!(bus.total_listeners(), 0);
    }

    #[test]
    fn rollback_restores_listener_table() {
        let (mut bus, _) = bus_with_log();
        bus.register(ListenerBinding::new("keep", EventKind::CommonSetup, |_| Ok(()))).unwrap();
        let checkpoint = bus.checkpoint();
        bus.register(ListenerBinding::new("drop1", EventKind::CommonSetup, |_| Ok(()))).unwrap();
        bus.register(ListenerBinding::new("drop2", EventKind::Done, |_| Ok(()))).unwrap();

        bus.rollback(checkpoint);
        assert_eq!(bus.total_listeners(), 1);
        assert_eq!(bus.listeners(&EventKind::CommonSetup)[0].name(), "keep");
        assert_eq!(bus.listener_count(&EventKind::Done), 0);
    }
}

//! Error interceptor invoked by the bus for every failed listener.
//!
//! The interceptor observes; it cannot stop delivery to the remaining listeners.
//! A panic raised by the interceptor itself is caught and logged by the bus.

use modhost_core::{InvocationError, LifecycleEvent};

use crate::binding::ListenerBinding;

pub trait ErrorInterceptor: Send + Sync {
    /// `listeners` is the full list registered for the event's kind;
    /// `index` points at the one that failed.
    fn on_listener_failed(
        &self,
        event: &LifecycleEvent,
        index: usize,
        listeners: &[ListenerBinding],
        cause: &InvocationError,
    );
}

impl<F> ErrorInterceptor for F
where
    F: Fn(&LifecycleEvent, usize, &[ListenerBinding], &InvocationError) + Send + Sync,
{
    fn on_listener_failed(
        &self,
        event: &LifecycleEvent,
        index: usize,
        listeners: &[ListenerBinding],
        cause: &InvocationError,
    ) {
        self(event, index, listeners, cause)
    }
}

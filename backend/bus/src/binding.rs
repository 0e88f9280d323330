use std::sync::Arc;

use modhost_core::{EventKind, HandlerScope, InvocationError, LifecycleEvent, invoke_isolated};

/// Invocable target of a listener, already bound to whatever it needs.
pub type ListenerFn = Arc<dyn Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync>;

/// A handler registered for one event kind. Immutable once built.
#[derive(Clone)]
pub struct ListenerBinding {
    name: String,
    kind: EventKind,
    scope: HandlerScope,
    priority: Option<i32>,
    target: ListenerFn,
}

impl ListenerBinding {
    pub fn new<F>(name: impl Into<String>, kind: EventKind, target: F) -> Self
    where
        F: Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_fn(name, kind, Arc::new(target))
    }

    pub fn from_fn(name: impl Into<String>, kind: EventKind, target: ListenerFn) -> Self {
        Self {
            name: name.into(),
            kind,
            scope: HandlerScope::Instance,
            priority: None,
            target,
        }
    }

    pub fn with_scope(mut self, scope: HandlerScope) -> Self {
        self.scope = scope;
        self
    }

    /// Priority is carried for diagnostics only; delivery follows registration order.
    pub fn with_priority(mut self, priority: Option<i32>) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn scope(&self) -> HandlerScope {
        self.scope
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Call the target, turning an error or a panic into [`InvocationError`].
    pub(crate) fn invoke(&self, event: &LifecycleEvent) -> Result<(), InvocationError> {
        invoke_isolated(|| (self.target)(event))
    }
}

impl std::fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for ListenerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind, self.scope)
    }
}

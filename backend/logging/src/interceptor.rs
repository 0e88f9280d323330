//! Default bus error interceptor.
//!
//! Logs one structured record per failed listener: the event, the index of
//! the failing listener and the full listener list, so a failure can be
//! traced to the exact handler without re-running the stage.

use chrono::{DateTime, Utc};
use modhost_bus::{ErrorInterceptor, ListenerBinding};
use modhost_core::{InvocationError, LifecycleEvent};
use serde::Serialize;
use tracing::error;

use crate::redact::redact_value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerFailureRecord {
    pub module_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_kind: String,
    /// Event payload, serialized and redacted.
    pub payload: String,
    pub index: usize,
    pub listeners: Vec<String>,
    pub cause: String,
    pub panicked: bool,
}

impl ListenerFailureRecord {
    pub fn new(
        module_id: &str,
        event: &LifecycleEvent,
        index: usize,
        listeners: &[ListenerBinding],
        cause: &InvocationError,
    ) -> Self {
        Self {
            module_id: module_id.to_string(),
            timestamp: Utc::now(),
            event_kind: event.kind.to_string(),
            payload: redact_value(&event.payload).to_string(),
            index,
            listeners: listeners.iter().map(|l| l.name().to_string()).collect(),
            cause: format!("{:#}", DisplayChain(cause)),
            panicked: cause.is_panic(),
        }
    }
}

impl std::fmt::Display for ListenerFailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Exception caught during firing event: {}", self.cause)?;
        writeln!(f, "\tModule: {}", self.module_id)?;
        writeln!(f, "\tEvent: {} {}", self.event_kind, self.payload)?;
        writeln!(f, "\tIndex: {}", self.index)?;
        writeln!(f, "\tListeners:")?;
        for (i, name) in self.listeners.iter().enumerate() {
            let marker = if i == self.index { " <-- failed" } else { "" };
            writeln!(f, "\t\t{i}: {name}{marker}")?;
        }
        Ok(())
    }
}

/// Renders an error with its sources, `outer: inner: root`.
struct DisplayChain<'a>(&'a InvocationError);

impl std::fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

/// Interceptor for one module's bus; logs failures under that module's id.
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    module_id: String,
}

impl LoggingInterceptor {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self { module_id: module_id.into() }
    }
}

impl ErrorInterceptor for LoggingInterceptor {
    fn on_listener_failed(
        &self,
        event: &LifecycleEvent,
        index: usize,
        listeners: &[ListenerBinding],
        cause: &InvocationError,
    ) {
        let record = ListenerFailureRecord::new(&self.module_id, event, index, listeners, cause);
        error!(
            target: "modhost::bus",
            module = %record.module_id,
            kind = %record.event_kind,
            index = record.index,
            panicked = record.panicked,
            "{record}"
        );
    }
}

use modhost_core::{DispatchError, EventKind, ListenerFailure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerStatus {
    Completed,
    Failed,
}

/// One listener invocation during a `post`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerReport {
    pub index: usize,
    pub listener: String,
    pub status: ListenerStatus,
}

/// Result of a single `post`: who ran, who failed, and why.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub kind: EventKind,
    pub reports: Vec<ListenerReport>,
    pub failures: Vec<ListenerFailure>,
}

impl DispatchOutcome {
    pub(crate) fn new(kind: EventKind) -> Self {
        Self { kind, reports: Vec::new(), failures: Vec::new() }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn invoked(&self) -> usize {
        self.reports.len()
    }

    /// Names of the listeners that ran, in delivery order.
    pub fn invoked_listeners(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.listener.as_str()).collect()
    }

    pub fn failed_listeners(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.listener.as_str()).collect()
    }

    pub fn first_failure(&self) -> Option<&ListenerFailure> {
        self.failures.first()
    }

    /// Collapse into the aggregate error when any listener failed.
    pub fn into_result(self) -> Result<DispatchOutcome, DispatchError> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let mut failures = self.failures.into_iter();
        match failures.next() {
            Some(first) => Err(DispatchError {
                kind: self.kind,
                first,
                additional: failures.collect(),
            }),
            None => Ok(DispatchOutcome {
                kind: self.kind,
                reports: self.reports,
                failures: Vec::new(),
            }),
        }
    }
}

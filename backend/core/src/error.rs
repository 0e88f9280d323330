use std::any::Any;
use std::panic::AssertUnwindSafe;

use thiserror::Error;

use crate::event::{EventKind, LoadingStage};
use crate::types::{ContainerState, HandlerDescriptor, HandlerScope};

/// Why a single call into module code (factory or listener) did not complete.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl InvocationError {
    /// Render a caught panic payload into an error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Run `f`, converting both a returned error and a panic into [`InvocationError`].
pub fn invoke_isolated<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, InvocationError> {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(InvocationError::Failed(e)),
        Err(payload) => Err(InvocationError::from_panic(payload)),
    }
}

/// A listener that failed during one `post`.
#[derive(Debug, Error)]
#[error("listener #{index} '{listener}' failed")]
pub struct ListenerFailure {
    /// Position of the listener in the kind's registration order.
    pub index: usize,
    pub listener: String,
    #[source]
    pub cause: InvocationError,
}

/// Aggregate failure of a `post`: at least one listener failed.
#[derive(Debug, Error)]
#[error("{count} listener(s) failed while handling {kind}; first: {first}", count = 1 + .additional.len())]
pub struct DispatchError {
    pub kind: EventKind,
    #[source]
    pub first: ListenerFailure,
    pub additional: Vec<ListenerFailure>,
}

impl DispatchError {
    pub fn failures(&self) -> impl Iterator<Item = &ListenerFailure> {
        std::iter::once(&self.first).chain(self.additional.iter())
    }
}

/// Event bus refused a binding or an event.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("event kind {kind} is not accepted by this bus")]
    KindRejected { kind: EventKind },
}

/// A declared handler could not be bound to the module.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("handler {descriptor} does not belong to class '{expected}'")]
    ForeignClass { descriptor: HandlerDescriptor, expected: String },

    #[error("handler {descriptor} names no entry point on its class")]
    UnknownEntryPoint { descriptor: HandlerDescriptor },

    #[error("handler {descriptor} is declared {declared} but the entry point is {actual}")]
    ScopeMismatch { descriptor: HandlerDescriptor, declared: HandlerScope, actual: HandlerScope },

    #[error("handler {descriptor} cannot accept {kind}")]
    SignatureMismatch { descriptor: HandlerDescriptor, kind: EventKind },

    #[error("handler {descriptor} listens for {kind}, which the module bus does not accept")]
    KindRejected { descriptor: HandlerDescriptor, kind: EventKind },
}

impl RegistrationError {
    pub fn descriptor(&self) -> &HandlerDescriptor {
        match self {
            Self::ForeignClass { descriptor, .. }
            | Self::UnknownEntryPoint { descriptor }
            | Self::ScopeMismatch { descriptor, .. }
            | Self::SignatureMismatch { descriptor, .. }
            | Self::KindRejected { descriptor, .. } => descriptor,
        }
    }
}

/// Structured error reported to the orchestrator: module id, stage, cause chain.
#[derive(Debug, Error)]
pub enum ModuleLoadingError {
    #[error("module '{module_id}': entry class '{class_name}' could not be resolved")]
    Resolution { module_id: String, class_name: String },

    #[error("module '{module_id}': failed to construct entry class '{class_name}'")]
    Construction {
        module_id: String,
        class_name: String,
        #[source]
        source: InvocationError,
    },

    #[error("module '{module_id}': failed to register event handlers")]
    Registration {
        module_id: String,
        #[source]
        source: RegistrationError,
    },

    #[error("module '{module_id}': error during {stage}")]
    Dispatch {
        module_id: String,
        stage: LoadingStage,
        #[source]
        source: DispatchError,
    },

    #[error("module '{module_id}': event rejected during {stage}")]
    Rejected {
        module_id: String,
        stage: LoadingStage,
        #[source]
        source: BusError,
    },

    #[error("module '{module_id}': cannot {operation} while {state}")]
    IllegalState { module_id: String, state: ContainerState, operation: &'static str },

    #[error("module '{module_id}' has not been constructed")]
    NotConstructed { module_id: String },
}

impl ModuleLoadingError {
    pub fn module_id(&self) -> &str {
        match self {
            Self::Resolution { module_id, .. }
            | Self::Construction { module_id, .. }
            | Self::Registration { module_id, .. }
            | Self::Dispatch { module_id, .. }
            | Self::Rejected { module_id, .. }
            | Self::IllegalState { module_id, .. }
            | Self::NotConstructed { module_id } => module_id,
        }
    }

    /// Stage the failure is attributed to. Precondition violations carry none.
    pub fn stage(&self) -> Option<LoadingStage> {
        match self {
            Self::Resolution { .. } | Self::Construction { .. } | Self::Registration { .. } => {
                Some(LoadingStage::Construct)
            }
            Self::Dispatch { stage, .. } | Self::Rejected { stage, .. } => Some(*stage),
            Self::IllegalState { .. } | Self::NotConstructed { .. } => None,
        }
    }

    /// Messages of this error and every source below it, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            out.push(err.to_string());
            current = err.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn invoke_isolated_captures_errors_and_panics() {
        let ok = invoke_isolated(|| Ok(7));
        assert_eq!(ok.unwrap(), 7);

        let failed = invoke_isolated::<()>(|| Err(anyhow!("boom")));
        assert_eq!(failed.unwrap_err().to_string(), "boom");

        let panicked = invoke_isolated::<()>(|| panic!("kaput"));
        let err = panicked.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panicked: kaput");
    }

    #[test]
    fn dispatch_error_names_first_listener() {
        let err = DispatchError {
            kind: EventKind::CommonSetup,
            first: ListenerFailure {
                index: 1,
                listener: "demo.Mod::on_setup".into(),
                cause: InvocationError::Failed(anyhow!("bad state")),
            },
            additional: vec![],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("1 listener(s) failed while handling common_setup"));
        assert!(msg.contains("demo.Mod::on_setup"));
        assert_eq!(err.failures().count(), 1);
    }

    #[test]
    fn loading_error_exposes_module_stage_and_chain() {
        let err = ModuleLoadingError::Construction {
            module_id: "m1".into(),
            class_name: "demo.Broken".into(),
            source: InvocationError::Failed(anyhow!("no default constructor")),
        };
        assert_eq!(err.module_id(), "m1");
        assert_eq!(err.stage(), Some(LoadingStage::Construct));
        let chain = err.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1], "no default constructor");
    }

    #[test]
    fn precondition_errors_have_no_stage() {
        let err = ModuleLoadingError::NotConstructed { module_id: "m1".into() };
        assert_eq!(err.stage(), None);
    }
}

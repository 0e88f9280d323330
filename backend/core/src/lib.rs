pub mod error;
pub mod event;
pub mod types;

pub use error::{
    invoke_isolated, BusError, DispatchError, InvocationError, ListenerFailure,
    ModuleLoadingError, RegistrationError,
};
pub use event::{EventKind, LifecycleEvent, LoadingStage};
pub use types::{ContainerState, HandlerDescriptor, HandlerScope, ModuleDescriptor, ScanData};

pub mod binding;
pub mod bus;
pub mod filter;
pub mod interceptor;
pub mod outcome;

pub use binding::{ListenerBinding, ListenerFn};
pub use bus::{Checkpoint, EventBus};
pub use filter::KindFilter;
pub use interceptor::ErrorInterceptor;
pub use outcome::{DispatchOutcome, ListenerReport, ListenerStatus};

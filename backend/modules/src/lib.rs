pub mod class;
pub mod container;
pub mod context;
pub mod manifest;
pub mod registrar;
pub mod sequence;

pub use class::{ClassRegistry, HandlerEntry, ModuleClass, ModuleClassBuilder, ModuleInstance};
pub use container::ModuleContainer;
pub use context::ConstructionContext;
pub use manifest::{ManifestEntry, ModuleManifest};
pub use registrar::register_subscribers;
pub use sequence::{LoadReport, LoadSequence, ModuleFailure, ModuleSummary};

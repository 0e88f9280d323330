//! Subscriber registration: binds a module's declared handlers onto its bus.
//!
//! Every descriptor is resolved against the module class before anything is
//! registered, so a bad descriptor leaves the bus exactly as it was.

use modhost_bus::{EventBus, ListenerBinding};
use modhost_core::{EventKind, HandlerDescriptor, RegistrationError};
use tracing::debug;

use crate::class::{ModuleClass, ModuleInstance};

/// Resolve `descriptors` against `class`, bind them to `instance` and register
/// them on `bus`. Returns the number of listeners added.
pub fn register_subscribers(
    module_id: &str,
    instance: &ModuleInstance,
    class: &ModuleClass,
    descriptors: &[HandlerDescriptor],
    bus: &mut EventBus,
) -> Result<usize, RegistrationError> {
    let mut bindings = Vec::new();
    for descriptor in descriptors {
        bindings.extend(resolve(instance, class, descriptor, bus)?);
    }

    let checkpoint = bus.checkpoint();
    let count = bindings.len();
    for (descriptor, binding) in bindings {
        let kind = binding.kind().clone();
        if bus.register(binding).is_err() {
            bus.rollback(checkpoint);
            return Err(RegistrationError::KindRejected { descriptor: descriptor.clone(), kind });
        }
    }
    debug!(module = %module_id, class = %class.name(), listeners = count, "Registered subscribers");
    Ok(count)
}

fn resolve<'d>(
    instance: &ModuleInstance,
    class: &ModuleClass,
    descriptor: &'d HandlerDescriptor,
    bus: &EventBus,
) -> Result<Vec<(&'d HandlerDescriptor, ListenerBinding)>, RegistrationError> {
    if descriptor.class_name != class.name() {
        return Err(RegistrationError::ForeignClass {
            descriptor: descriptor.clone(),
            expected: class.name().to_string(),
        });
    }
    let Some(entry) = class.handler(&descriptor.entry_point) else {
        return Err(RegistrationError::UnknownEntryPoint { descriptor: descriptor.clone() });
    };
    if entry.scope() != descriptor.scope {
        return Err(RegistrationError::ScopeMismatch {
            descriptor: descriptor.clone(),
            declared: descriptor.scope,
            actual: entry.scope(),
        });
    }

    let kinds: &[EventKind] =
        if descriptor.kinds.is_empty() { entry.kinds() } else { &descriptor.kinds };
    let target = entry.bind(instance);
    let mut bindings = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !entry.accepts(kind) {
            return Err(RegistrationError::SignatureMismatch {
                descriptor: descriptor.clone(),
                kind: kind.clone(),
            });
        }
        if !bus.accepts(kind) {
            return Err(RegistrationError::KindRejected {
                descriptor: descriptor.clone(),
                kind: kind.clone(),
            });
        }
        let binding = ListenerBinding::from_fn(descriptor.to_string(), kind.clone(), target.clone())
            .with_scope(entry.scope())
            .with_priority(descriptor.priority);
        bindings.push((descriptor, binding));
    }
    Ok(bindings)
}

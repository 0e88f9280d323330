use modhost_bus::{EventBus, ListenerBinding};
use modhost_core::{BusError, EventKind, LifecycleEvent, ModuleDescriptor};

/// Handed to a module's factory while it is being constructed.
///
/// Gives the module access to its own bus so it can subscribe listeners
/// programmatically. Anything registered here is discarded if construction
/// or handler registration fails.
pub struct ConstructionContext<'a> {
    descriptor: &'a ModuleDescriptor,
    bus: &'a mut EventBus,
}

impl<'a> ConstructionContext<'a> {
    pub(crate) fn new(descriptor: &'a ModuleDescriptor, bus: &'a mut EventBus) -> Self {
        Self { descriptor, bus }
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        self.descriptor
    }

    pub fn module_id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn bus(&mut self) -> &mut EventBus {
        self.bus
    }

    /// Subscribe `f` to `kind`; the listener is named `<module id>::<name>`.
    pub fn listen<F>(&mut self, kind: EventKind, name: &str, f: F) -> Result<(), BusError>
    where
        F: Fn(&LifecycleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let binding = ListenerBinding::new(format!("{}::{name}", self.descriptor.id), kind, f);
        self.bus.register(binding)
    }
}

impl std::fmt::Debug for ConstructionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructionContext")
            .field("module", &self.descriptor.id)
            .field("bus", &self.bus)
            .finish()
    }
}

//! Module container: one module instance, one private bus, one state machine.
//!
//! A container starts `Unconstructed`. `construct` instantiates the entry
//! class and wires its declared handlers as a single step, so no event can
//! reach a half-registered module. Later stage events are forwarded to the
//! bus; the first listener failure moves the container to `Failed`, which is
//! terminal.

use std::sync::Arc;

use modhost_bus::{DispatchOutcome, ErrorInterceptor, EventBus, KindFilter};
use modhost_core::{
    ContainerState, EventKind, LifecycleEvent, LoadingStage, ModuleDescriptor, ModuleLoadingError,
    ScanData, invoke_isolated,
};
use tracing::{debug, error, info};

use crate::class::{ClassRegistry, ModuleClass, ModuleInstance};
use crate::context::ConstructionContext;
use crate::registrar::register_subscribers;

pub struct ModuleContainer {
    descriptor: Arc<ModuleDescriptor>,
    class: Arc<ModuleClass>,
    scan_data: ScanData,
    bus: EventBus,
    instance: Option<ModuleInstance>,
    state: ContainerState,
    stage: Option<LoadingStage>,
}

impl ModuleContainer {
    /// Build a container for `entry_class`, resolved through `classes`.
    ///
    /// The bus carries module bus events only; see [`Self::with_filter`].
    pub fn new(
        descriptor: Arc<ModuleDescriptor>,
        classes: &ClassRegistry,
        entry_class: &str,
        scan_data: ScanData,
        interceptor: Arc<dyn ErrorInterceptor>,
    ) -> Result<Self, ModuleLoadingError> {
        Self::with_filter(descriptor, classes, entry_class, scan_data, interceptor, KindFilter::default())
    }

    pub fn with_filter(
        descriptor: Arc<ModuleDescriptor>,
        classes: &ClassRegistry,
        entry_class: &str,
        scan_data: ScanData,
        interceptor: Arc<dyn ErrorInterceptor>,
        filter: KindFilter,
    ) -> Result<Self, ModuleLoadingError> {
        debug!(module = %descriptor.id, class = %entry_class, "Resolving module entry class");
        let Some(class) = classes.resolve(entry_class) else {
            error!(module = %descriptor.id, class = %entry_class, "Failed to resolve module class");
            return Err(ModuleLoadingError::Resolution {
                module_id: descriptor.id.clone(),
                class_name: entry_class.to_string(),
            });
        };

        Ok(Self {
            descriptor,
            class,
            scan_data,
            bus: EventBus::new(interceptor, filter),
            instance: None,
            state: ContainerState::Unconstructed,
            stage: None,
        })
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn module_id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Last stage entered through [`Self::transition`] or [`Self::construct`].
    pub fn current_stage(&self) -> Option<LoadingStage> {
        self.stage
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Instantiate the entry class and register its declared handlers.
    ///
    /// Either both succeed, or the container ends `Failed` with an empty
    /// instance slot and the bus as it was before the call.
    pub fn construct(&mut self) -> Result<(), ModuleLoadingError> {
        self.require(ContainerState::Unconstructed == self.state, "construct")?;
        self.stage = Some(LoadingStage::Construct);

        let checkpoint = self.bus.checkpoint();
        let class = Arc::clone(&self.class);
        debug!(module = %self.descriptor.id, class = %class.name(), "Loading module");
        let built = {
            let mut ctx = ConstructionContext::new(&self.descriptor, &mut self.bus);
            invoke_isolated(|| class.instantiate(&mut ctx))
        };
        let instance = match built {
            Ok(instance) => instance,
            Err(source) => {
                self.bus.rollback(checkpoint);
                self.state = ContainerState::Failed;
                error!(
                    module = %self.descriptor.id,
                    class = %class.name(),
                    error = %source,
                    "Failed to create module instance"
                );
                return Err(ModuleLoadingError::Construction {
                    module_id: self.descriptor.id.clone(),
                    class_name: class.name().to_string(),
                    source,
                });
            }
        };
        debug!(module = %self.descriptor.id, "Injecting automatic event subscribers");

        if let Err(source) = register_subscribers(
            &self.descriptor.id,
            &instance,
            &class,
            &self.scan_data.handlers,
            &mut self.bus,
        ) {
            self.bus.rollback(checkpoint);
            self.state = ContainerState::Failed;
            error!(
                module = %self.descriptor.id,
                descriptor = %source.descriptor(),
                error = %source,
                "Failed to register automatic subscribers"
            );
            return Err(ModuleLoadingError::Registration {
                module_id: self.descriptor.id.clone(),
                source,
            });
        }

        self.instance = Some(instance);
        self.state = ContainerState::Constructed;
        info!(
            module = %self.descriptor.id,
            class = %class.name(),
            listeners = self.bus.total_listeners(),
            "Constructed module"
        );
        Ok(())
    }

    /// Forward `event` to the module's bus.
    ///
    /// Any listener failure fails the container; the error carries the first cause.
    pub fn accept_event(&mut self, event: &LifecycleEvent) -> Result<DispatchOutcome, ModuleLoadingError> {
        self.require(self.state.is_live(), "accept events")?;
        let stage = event.kind.stage().or(self.stage).unwrap_or(LoadingStage::Construct);

        debug!(module = %self.descriptor.id, kind = %event.kind, "Firing event for module");
        let outcome = self.bus.post(event).map_err(|source| ModuleLoadingError::Rejected {
            module_id: self.descriptor.id.clone(),
            stage,
            source,
        })?;
        if let Some(entered) = event.kind.stage() {
            self.stage = Some(entered);
        }

        match outcome.into_result() {
            Ok(outcome) => {
                if let Some(reached) = event.kind.stage().filter(|s| *s != LoadingStage::Construct) {
                    self.state = ContainerState::Active(reached);
                }
                debug!(module = %self.descriptor.id, kind = %event.kind, "Fired event for module");
                Ok(outcome)
            }
            Err(source) => {
                self.state = ContainerState::Failed;
                error!(
                    module = %self.descriptor.id,
                    kind = %event.kind,
                    stage = %stage,
                    error = %source,
                    "Caught exception during event dispatch"
                );
                Err(ModuleLoadingError::Dispatch {
                    module_id: self.descriptor.id.clone(),
                    stage,
                    source,
                })
            }
        }
    }

    /// Enter `stage`: run its activity (construction for `Construct`), then post the stage event.
    pub fn transition(
        &mut self,
        stage: LoadingStage,
        payload: serde_json::Value,
    ) -> Result<DispatchOutcome, ModuleLoadingError> {
        self.require(self.state != ContainerState::Failed, "transition")?;
        if stage == LoadingStage::Construct {
            self.construct()?;
        }
        self.accept_event(&LifecycleEvent::stage(stage).with_payload(payload))
    }

    /// Tell the module its configuration was loaded.
    pub fn config_loaded(&mut self, payload: serde_json::Value) -> Result<DispatchOutcome, ModuleLoadingError> {
        self.accept_event(&LifecycleEvent::new(EventKind::ConfigLoading, payload))
    }

    /// Tell the module its configuration was reloaded.
    pub fn config_reloaded(&mut self, payload: serde_json::Value) -> Result<DispatchOutcome, ModuleLoadingError> {
        self.accept_event(&LifecycleEvent::new(EventKind::ConfigReloading, payload))
    }

    /// True iff `candidate` is the very instance held by this container.
    pub fn matches(&self, candidate: &ModuleInstance) -> bool {
        self.instance
            .as_ref()
            .is_some_and(|held| std::ptr::addr_eq(Arc::as_ptr(held), Arc::as_ptr(candidate)))
    }

    /// Like [`Self::matches`], for a plain reference to the module value.
    pub fn matches_module<M: 'static>(&self, candidate: &M) -> bool {
        self.instance
            .as_ref()
            .is_some_and(|held| std::ptr::addr_eq(Arc::as_ptr(held), candidate as *const M))
    }

    pub fn instance(&self) -> Result<&ModuleInstance, ModuleLoadingError> {
        self.instance.as_ref().ok_or_else(|| ModuleLoadingError::NotConstructed {
            module_id: self.descriptor.id.clone(),
        })
    }

    /// The instance as its concrete type, if it is an `M`.
    pub fn instance_as<M: Send + Sync + 'static>(&self) -> Option<Arc<M>> {
        self.instance.as_ref().and_then(|held| Arc::clone(held).downcast::<M>().ok())
    }

    fn require(&self, allowed: bool, operation: &'static str) -> Result<(), ModuleLoadingError> {
        if allowed {
            return Ok(());
        }
        Err(ModuleLoadingError::IllegalState {
            module_id: self.descriptor.id.clone(),
            state: self.state,
            operation,
        })
    }
}

impl std::fmt::Debug for ModuleContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContainer")
            .field("module", &self.descriptor.id)
            .field("class", &self.class.name())
            .field("state", &self.state)
            .field("stage", &self.stage)
            .field("bus", &self.bus)
            .finish()
    }
}

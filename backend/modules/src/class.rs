//! Module classes and the registry that resolves them by name.
//!
//! A class is the entry type of a module: a no-argument factory plus a table
//! of named handler entry points. Handlers are typed against the module's
//! concrete type and erased here, so the registrar can bind them to an
//! instance without knowing that type.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use modhost_bus::ListenerFn;
use modhost_core::{EventKind, HandlerScope, LifecycleEvent};
use tracing::info;

use crate::context::ConstructionContext;

/// A constructed module. Identity is the allocation, compared by pointer.
pub type ModuleInstance = Arc<dyn Any + Send + Sync>;

type FactoryFn =
    Arc<dyn Fn(&mut ConstructionContext<'_>) -> Result<ModuleInstance> + Send + Sync>;
type HandlerFn = Arc<dyn Fn(Option<&ModuleInstance>, &LifecycleEvent) -> Result<()> + Send + Sync>;

/// A named entry point on a module class.
#[derive(Clone)]
pub struct HandlerEntry {
    kinds: Vec<EventKind>,
    scope: HandlerScope,
    target: HandlerFn,
}

impl HandlerEntry {
    /// Kinds the entry point's signature accepts.
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn scope(&self) -> HandlerScope {
        self.scope
    }

    pub fn accepts(&self, kind: &EventKind) -> bool {
        self.kinds.contains(kind)
    }

    /// Bind the entry point, producing a listener target.
    ///
    /// Instance handlers capture `instance`; static handlers ignore it.
    pub(crate) fn bind(&self, instance: &ModuleInstance) -> ListenerFn {
        let target = Arc::clone(&self.target);
        let instance = match self.scope {
            HandlerScope::Instance => Some(Arc::clone(instance)),
            HandlerScope::Static => None,
        };
        Arc::new(move |event: &LifecycleEvent| target(instance.as_ref(), event))
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("kinds", &self.kinds)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Resolved entry type of a module.
pub struct ModuleClass {
    name: String,
    factory: FactoryFn,
    handlers: HashMap<String, HandlerEntry>,
}

impl ModuleClass {
    /// Start describing a class whose instances are `M`.
    pub fn builder<M, F>(name: impl Into<String>, factory: F) -> ModuleClassBuilder<M>
    where
        M: Send + Sync + 'static,
        F: Fn(&mut ConstructionContext<'_>) -> Result<M> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |ctx: &mut ConstructionContext<'_>| {
            factory(ctx).map(|module| Arc::new(module) as ModuleInstance)
        });
        ModuleClassBuilder {
            name: name.into(),
            factory,
            handlers: HashMap::new(),
            _module: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self, entry_point: &str) -> Option<&HandlerEntry> {
        self.handlers.get(entry_point)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the no-argument construction path.
    pub(crate) fn instantiate(&self, ctx: &mut ConstructionContext<'_>) -> Result<ModuleInstance> {
        (self.factory)(ctx)
    }
}

impl std::fmt::Debug for ModuleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleClass")
            .field("name", &self.name)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

pub struct ModuleClassBuilder<M> {
    name: String,
    factory: FactoryFn,
    handlers: HashMap<String, HandlerEntry>,
    _module: PhantomData<fn() -> M>,
}

impl<M: Send + Sync + 'static> ModuleClassBuilder<M> {
    /// Declare an entry point invoked on the module instance.
    pub fn handler<F>(
        mut self,
        entry_point: impl Into<String>,
        kinds: impl IntoIterator<Item = EventKind>,
        f: F,
    ) -> Self
    where
        F: Fn(&M, &LifecycleEvent) -> Result<()> + Send + Sync + 'static,
    {
        let entry_point = entry_point.into();
        let class_name = self.name.clone();
        let name = entry_point.clone();
        let target: HandlerFn = Arc::new(move |instance: Option<&ModuleInstance>, event: &LifecycleEvent| {
            let instance = instance
                .ok_or_else(|| anyhow!("{class_name}::{name} invoked without an instance"))?;
            let module = (**instance)
                .downcast_ref::<M>()
                .with_context(|| format!("{class_name}::{name} bound to a foreign instance"))?;
            f(module, event)
        });
        self.handlers.insert(
            entry_point,
            HandlerEntry { kinds: kinds.into_iter().collect(), scope: HandlerScope::Instance, target },
        );
        self
    }

    /// Declare an entry point in the class's static scope.
    pub fn static_handler<F>(
        mut self,
        entry_point: impl Into<String>,
        kinds: impl IntoIterator<Item = EventKind>,
        f: F,
    ) -> Self
    where
        F: Fn(&LifecycleEvent) -> Result<()> + Send + Sync + 'static,
    {
        let target: HandlerFn = Arc::new(move |_: Option<&ModuleInstance>, event: &LifecycleEvent| f(event));
        self.handlers.insert(
            entry_point.into(),
            HandlerEntry { kinds: kinds.into_iter().collect(), scope: HandlerScope::Static, target },
        );
        self
    }

    pub fn build(self) -> ModuleClass {
        ModuleClass { name: self.name, factory: self.factory, handlers: self.handlers }
    }
}

/// Name → class table handed to containers in place of a class loader.
#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<ModuleClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ModuleClass) -> Result<()> {
        if self.classes.contains_key(class.name()) {
            bail!("Module class '{}' is already registered", class.name());
        }
        info!(class = %class.name(), "Registered module class");
        self.classes.insert(class.name().to_string(), Arc::new(class));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<ModuleClass>> {
        self.classes.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry").field("classes", &self.names()).finish()
    }
}

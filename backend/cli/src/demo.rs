//! Built-in module classes available to `modhost run`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use modhost_core::{EventKind, LifecycleEvent, LoadingStage};
use modhost_modules::{ClassRegistry, ModuleClass};
use tracing::info;

/// Logs a greeting on setup and counts every event it sees.
pub struct Greeter {
    module_id: String,
    seen: AtomicUsize,
    config: Mutex<serde_json::Value>,
}

impl Greeter {
    fn record(&self, event: &LifecycleEvent) {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        info!(module = %self.module_id, kind = %event.kind, seen, "Greeter observed event");
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }

    /// Payload of the most recent config event.
    pub fn last_config(&self) -> serde_json::Value {
        self.config.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Fails during sided setup; panics if it ever reaches IMC processing.
pub struct Faulty;

fn greeter() -> ModuleClass {
    ModuleClass::builder("demo.Greeter", |ctx| {
        let module_id = ctx.module_id().to_string();
        let farewell_id = module_id.clone();
        ctx.listen(EventKind::Complete, "farewell", move |_| {
            info!(module = %farewell_id, "Greeter finished loading");
            Ok(())
        })?;
        Ok(Greeter { module_id, seen: AtomicUsize::new(0), config: Mutex::default() })
    })
    .handler("on_setup", [EventKind::CommonSetup, EventKind::SidedSetup], |m: &Greeter, e| {
        info!(module = %m.module_id, side = %e.payload, "Hello from greeter");
        m.record(e);
        Ok(())
    })
    .handler("on_config", [EventKind::ConfigLoading, EventKind::ConfigReloading], |m: &Greeter, e| {
        m.record(e);
        let mut config = m.config.lock().map_err(|_| anyhow!("greeter config lock poisoned"))?;
        *config = e.payload.clone();
        Ok(())
    })
    .handler("on_any_stage", LoadingStage::ALL.map(EventKind::from), |m: &Greeter, e| {
        m.record(e);
        Ok(())
    })
    .build()
}

fn faulty() -> ModuleClass {
    ModuleClass::builder("demo.Faulty", |_| Ok(Faulty))
        .handler("explode", [EventKind::SidedSetup], |_: &Faulty, _| {
            bail!("sided setup is not supported on this side")
        })
        .handler("panic_on_imc", [EventKind::ProcessImc], |_: &Faulty, _| -> Result<()> {
            panic!("IMC queue corrupted")
        })
        .build()
}

fn auditor() -> ModuleClass {
    ModuleClass::builder("demo.Auditor", |_| Ok(()))
        .static_handler("audit", LoadingStage::ALL.map(EventKind::from), |e| {
            info!(kind = %e.kind, "Audit");
            Ok(())
        })
        .build()
}

/// Registry of every built-in class.
pub fn builtin_classes() -> Result<ClassRegistry> {
    let mut classes = ClassRegistry::new();
    classes.register(greeter())?;
    classes.register(faulty())?;
    classes.register(auditor())?;
    Ok(classes)
}

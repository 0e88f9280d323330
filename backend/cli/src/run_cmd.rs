//! `modhost run`: build containers from a manifest and drive them through
//! the configured loading stages.

use std::sync::Arc;

use anyhow::{Context, Result};
use modhost_bus::KindFilter;
use modhost_config::ModHostConfig;
use modhost_logging::LoggingInterceptor;
use modhost_modules::{
    ClassRegistry, LoadReport, LoadSequence, ModuleContainer, ModuleFailure, ModuleManifest,
};
use tracing::{info, warn};

/// Load every manifest entry. Entries whose class cannot be resolved are
/// reported as failures and never get a container. Each module receives the
/// config as its `ConfigLoading` payload once constructed.
pub fn load_modules(
    manifest: &ModuleManifest,
    config: &ModHostConfig,
    classes: &ClassRegistry,
) -> Result<(Vec<ModuleContainer>, LoadReport)> {
    let filter = if config.accept_custom_events() { KindFilter::Any } else { KindFilter::ModuleBus };

    let mut containers = Vec::with_capacity(manifest.modules.len());
    let mut unresolved = Vec::new();
    for entry in &manifest.modules {
        let interceptor = Arc::new(LoggingInterceptor::new(entry.id.as_str()));
        match ModuleContainer::with_filter(
            Arc::new(entry.descriptor()),
            classes,
            &entry.entry_class,
            entry.scan_data(),
            interceptor,
            filter.clone(),
        ) {
            Ok(container) => containers.push(container),
            Err(err) => {
                warn!(module = %entry.id, error = %err, "Skipping module");
                unresolved.push(ModuleFailure::from(&err));
            }
        }
    }

    let payload = serde_json::to_value(config).context("Failed to serialize config for modules")?;
    let sequence = LoadSequence::new(config.stages())?
        .abort_on_first_failure(config.abort_on_first_failure())
        .with_config(payload);
    info!(modules = containers.len(), stages = sequence.stages().len(), "Loading modules");
    let mut report = sequence.run(&mut containers);
    report.failures.splice(0..0, unresolved);
    Ok((containers, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{builtin_classes, Greeter};
    use modhost_config::{apply_all_defaults, LoaderConfig};
    use modhost_core::{ContainerState, LoadingStage};

    const MANIFEST: &str = r#"
modules:
  - id: greeter
    name: Greeter
    entryClass: demo.Greeter
    handlers:
      - className: demo.Greeter
        entryPoint: on_setup
  - id: faulty
    name: Faulty
    entryClass: demo.Faulty
    handlers:
      - className: demo.Faulty
        entryPoint: explode
  - id: ghost
    name: Ghost
    entryClass: demo.Missing
"#;

    fn run(config: ModHostConfig) -> (Vec<ModuleContainer>, LoadReport) {
        let manifest = ModuleManifest::parse(MANIFEST).unwrap();
        load_modules(&manifest, &apply_all_defaults(config), &builtin_classes().unwrap()).unwrap()
    }

    #[test]
    fn healthy_module_loads_next_to_failing_ones() {
        let (containers, report) = run(ModHostConfig::default());

        assert_eq!(report.failed_modules(), vec!["ghost", "faulty"]);
        assert_eq!(report.failures[0].stage, Some(LoadingStage::Construct));
        assert_eq!(report.failures[1].stage, Some(LoadingStage::SidedSetup));
        assert_eq!(containers.len(), 2);

        let greeter = &containers[0];
        assert_eq!(greeter.state(), ContainerState::Active(LoadingStage::Done));
        // on_setup is bound to both setup stages.
        assert_eq!(greeter.instance_as::<Greeter>().unwrap().seen(), 2);
        assert_eq!(containers[1].state(), ContainerState::Failed);
    }

    #[test]
    fn config_reaches_modules_that_subscribe_to_it() {
        let manifest = ModuleManifest::parse(
            r#"{"modules":[{"id":"g","name":"G","entryClass":"demo.Greeter",
                "handlers":[{"className":"demo.Greeter","entryPoint":"on_config"}]}]}"#,
        )
        .unwrap();
        let config = apply_all_defaults(ModHostConfig::default());
        let (containers, report) = load_modules(&manifest, &config, &builtin_classes().unwrap()).unwrap();
        assert!(report.is_success());
        let greeter = containers[0].instance_as::<Greeter>().unwrap();
        assert_eq!(greeter.seen(), 1);
        assert_eq!(greeter.last_config()["logging"]["level"], "info");
    }

    #[test]
    fn configured_stages_limit_the_run() {
        let config = ModHostConfig {
            loader: Some(LoaderConfig {
                stages: Some(vec![LoadingStage::Construct, LoadingStage::CommonSetup]),
                abort_on_first_failure: None,
            }),
            ..Default::default()
        };
        let (containers, report) = run(config);
        assert_eq!(report.failed_modules(), vec!["ghost"]);
        assert_eq!(containers[1].state(), ContainerState::Active(LoadingStage::CommonSetup));
    }
}

//! Drives a set of containers through the loading stages.
//!
//! Each stage is delivered to every live container before the next stage
//! begins. A failing container is reported and skipped afterwards; its
//! siblings keep loading.

use anyhow::{Result, bail};
use modhost_core::{ContainerState, LoadingStage, ModuleLoadingError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::container::ModuleContainer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleFailure {
    pub module_id: String,
    pub stage: Option<LoadingStage>,
    /// Error message followed by its causes, outermost first.
    pub causes: Vec<String>,
}

impl From<&ModuleLoadingError> for ModuleFailure {
    fn from(err: &ModuleLoadingError) -> Self {
        Self { module_id: err.module_id().to_string(), stage: err.stage(), causes: err.chain() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub module_id: String,
    pub class_name: String,
    pub state: ContainerState,
}

/// What happened during one run of a [`LoadSequence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub completed_stages: Vec<LoadingStage>,
    pub failures: Vec<ModuleFailure>,
    pub modules: Vec<ModuleSummary>,
    /// Stage after which the run stopped early, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<LoadingStage>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_modules(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.module_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSequence {
    stages: Vec<LoadingStage>,
    abort_on_first_failure: bool,
    /// Posted as `ConfigLoading` right after construction, when set.
    config: Option<serde_json::Value>,
}

impl Default for LoadSequence {
    fn default() -> Self {
        Self { stages: LoadingStage::ALL.to_vec(), abort_on_first_failure: false, config: None }
    }
}

impl LoadSequence {
    /// `stages` must start with `Construct` and be strictly increasing;
    /// otherwise no container would ever be built.
    pub fn new(stages: Vec<LoadingStage>) -> Result<Self> {
        match stages.first() {
            None => bail!("Load sequence needs at least one stage"),
            Some(first) if *first != LoadingStage::Construct => {
                bail!("Load sequence must start with 'construct', found '{first}'")
            }
            Some(_) => {}
        }
        if let Some(pair) = stages.windows(2).find(|pair| pair[1] <= pair[0]) {
            bail!("Stage '{}' does not follow '{}'", pair[1], pair[0]);
        }
        Ok(Self { stages, ..Self::default() })
    }

    /// Deliver `payload` to every module as its loaded configuration once
    /// construction is done.
    pub fn with_config(mut self, payload: serde_json::Value) -> Self {
        self.config = Some(payload);
        self
    }

    /// Stop after the first stage in which any module failed.
    pub fn abort_on_first_failure(mut self, abort: bool) -> Self {
        self.abort_on_first_failure = abort;
        self
    }

    pub fn stages(&self) -> &[LoadingStage] {
        &self.stages
    }

    pub fn run(&self, containers: &mut [ModuleContainer]) -> LoadReport {
        let mut report = LoadReport::default();

        for &stage in &self.stages {
            info!(stage = %stage, modules = containers.len(), "Dispatching loading stage");
            let mut stage_failed = false;
            for container in containers.iter_mut() {
                let runnable = match stage {
                    LoadingStage::Construct => container.state() == ContainerState::Unconstructed,
                    _ => container.state().is_live(),
                };
                if !runnable {
                    continue;
                }
                let mut result = container.transition(stage, serde_json::Value::Null).map(drop);
                if result.is_ok() && stage == LoadingStage::Construct {
                    if let Some(payload) = &self.config {
                        result = container.config_loaded(payload.clone()).map(drop);
                    }
                }
                if let Err(err) = result {
                    warn!(module = %container.module_id(), stage = %stage, error = %err, "Module failed to load");
                    report.failures.push(ModuleFailure::from(&err));
                    stage_failed = true;
                }
            }
            report.completed_stages.push(stage);
            if stage_failed && self.abort_on_first_failure {
                warn!(stage = %stage, "Aborting load after failed stage");
                report.aborted_at = Some(stage);
                break;
            }
        }

        report.modules = containers
            .iter()
            .map(|c| ModuleSummary {
                module_id: c.module_id().to_string(),
                class_name: c.class_name().to_string(),
                state: c.state(),
            })
            .collect();
        info!(
            modules = report.modules.len(),
            failures = report.failures.len(),
            "Load sequence finished"
        );
        report
    }
}

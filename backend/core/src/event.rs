use serde::{Deserialize, Serialize};

/// Loading stages a host walks every module through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStage {
    /// Entry type is instantiated and its handlers are wired.
    Construct,
    /// Setup shared by every host flavour.
    CommonSetup,
    /// Setup specific to the host flavour (client, server, headless).
    SidedSetup,
    /// Modules enqueue inter-module messages.
    EnqueueImc,
    /// Modules drain the messages addressed to them.
    ProcessImc,
    /// Loading finished for every module.
    Complete,
    /// Final stage; nothing is posted after it.
    Done,
}

impl LoadingStage {
    /// Every stage in host order.
    pub const ALL: [LoadingStage; 7] = [
        LoadingStage::Construct,
        LoadingStage::CommonSetup,
        LoadingStage::SidedSetup,
        LoadingStage::EnqueueImc,
        LoadingStage::ProcessImc,
        LoadingStage::Complete,
        LoadingStage::Done,
    ];

    /// The stage following this one, if any.
    pub fn next(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Construct => "construct",
            Self::CommonSetup => "common_setup",
            Self::SidedSetup => "sided_setup",
            Self::EnqueueImc => "enqueue_imc",
            Self::ProcessImc => "process_imc",
            Self::Complete => "complete",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for LoadingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag of a [`LifecycleEvent`]. Listeners are keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Construct,
    CommonSetup,
    SidedSetup,
    EnqueueImc,
    ProcessImc,
    Complete,
    Done,
    /// A module's configuration was loaded for the first time.
    ConfigLoading,
    /// A module's configuration changed on disk and was reloaded.
    ConfigReloading,
    /// Host-defined event outside the module bus vocabulary.
    Custom(String),
}

impl EventKind {
    /// The loading stage this kind announces, if it is a stage event.
    pub fn stage(&self) -> Option<LoadingStage> {
        match self {
            Self::Construct => Some(LoadingStage::Construct),
            Self::CommonSetup => Some(LoadingStage::CommonSetup),
            Self::SidedSetup => Some(LoadingStage::SidedSetup),
            Self::EnqueueImc => Some(LoadingStage::EnqueueImc),
            Self::ProcessImc => Some(LoadingStage::ProcessImc),
            Self::Complete => Some(LoadingStage::Complete),
            Self::Done => Some(LoadingStage::Done),
            Self::ConfigLoading | Self::ConfigReloading | Self::Custom(_) => None,
        }
    }

    pub fn is_config_event(&self) -> bool {
        matches!(self, Self::ConfigLoading | Self::ConfigReloading)
    }

    /// True for every kind a module bus carries by default (stage and config events).
    pub fn is_module_bus_event(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<LoadingStage> for EventKind {
    fn from(stage: LoadingStage) -> Self {
        match stage {
            LoadingStage::Construct => Self::Construct,
            LoadingStage::CommonSetup => Self::CommonSetup,
            LoadingStage::SidedSetup => Self::SidedSetup,
            LoadingStage::EnqueueImc => Self::EnqueueImc,
            LoadingStage::ProcessImc => Self::ProcessImc,
            LoadingStage::Complete => Self::Complete,
            LoadingStage::Done => Self::Done,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigLoading => f.write_str("config_loading"),
            Self::ConfigReloading => f.write_str("config_reloading"),
            Self::Custom(name) => write!(f, "custom:{name}"),
            other => match other.stage() {
                Some(stage) => f.write_str(stage.as_str()),
                None => write!(f, "{other:?}"),
            },
        }
    }
}

/// A typed event posted to a module's bus.
///
/// Produced by the orchestrator, forwarded verbatim by the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }

    /// Event announcing `stage`, with an empty payload.
    pub fn stage(stage: LoadingStage) -> Self {
        Self::new(stage.into(), serde_json::Value::Null)
    }

    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(EventKind::Custom(name.into()), payload)
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

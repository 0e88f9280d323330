use serde::{Deserialize, Serialize};

use crate::event::{EventKind, LoadingStage};

/// Identity of a module, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), version: None }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Whether a handler is bound to the module instance or to the class itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerScope {
    #[default]
    Instance,
    Static,
}

impl std::fmt::Display for HandlerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance => f.write_str("instance"),
            Self::Static => f.write_str("static"),
        }
    }
}

/// One declared handler, as reported by the external scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerDescriptor {
    /// Class declaring the handler.
    pub class_name: String,
    /// Entry point name inside that class.
    pub entry_point: String,
    /// Kinds the handler subscribes to. Empty means every kind the entry point accepts.
    #[serde(default)]
    pub kinds: Vec<EventKind>,
    #[serde(default)]
    pub scope: HandlerScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl HandlerDescriptor {
    pub fn new(class_name: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            entry_point: entry_point.into(),
            kinds: Vec::new(),
            scope: HandlerScope::Instance,
            priority: None,
        }
    }

    pub fn on(mut self, kind: impl Into<EventKind>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn with_scope(mut self, scope: HandlerScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl std::fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.class_name, self.entry_point)
    }
}

/// Opaque scan metadata for one module: the handlers it declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanData {
    #[serde(default)]
    pub handlers: Vec<HandlerDescriptor>,
}

impl ScanData {
    pub fn new(handlers: Vec<HandlerDescriptor>) -> Self {
        Self { handlers }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Lifecycle state of a module container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum ContainerState {
    /// Created, entry type not yet instantiated.
    Unconstructed,
    /// Instance built and handlers live on the bus.
    Constructed,
    /// The given post-construction stage was delivered successfully.
    Active(LoadingStage),
    /// Terminal. Every further operation fails fast.
    Failed,
}

impl ContainerState {
    pub fn is_live(self) -> bool {
        matches!(self, Self::Constructed | Self::Active(_))
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconstructed => f.write_str("unconstructed"),
            Self::Constructed => f.write_str("constructed"),
            Self::Active(stage) => write!(f, "active({stage})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_from_json() {
        let raw = r#"{"className":"demo.Greeter","entryPoint":"on_setup","kinds":["common_setup"]}"#;
        let desc: HandlerDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(desc.scope, HandlerScope::Instance);
        assert_eq!(desc.kinds, vec![EventKind::CommonSetup]);
        assert_eq!(desc.to_string(), "demo.Greeter::on_setup");
    }

    #[test]
    fn only_constructed_and_active_are_live() {
        assert!(!ContainerState::Unconstructed.is_live());
        assert!(ContainerState::Constructed.is_live());
        assert!(ContainerState::Active(LoadingStage::Complete).is_live());
        assert!(!ContainerState::Failed.is_live());
        assert_eq!(
            ContainerState::Active(LoadingStage::SidedSetup).to_string(),
            "active(sided_setup)"
        );
    }
}

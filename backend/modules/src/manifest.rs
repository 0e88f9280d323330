//! Module manifest: the orchestrator-side list of modules to load.
//!
//! Each entry names the module, its entry class, and the handler
//! descriptors an external scanner found for it.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use modhost_core::{HandlerDescriptor, ModuleDescriptor, ScanData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub entry_class: String,
    #[serde(default)]
    pub handlers: Vec<HandlerDescriptor>,
}

impl ManifestEntry {
    pub fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: self.id.clone(),
            display_name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn scan_data(&self) -> ScanData {
        ScanData::new(self.handlers.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default)]
    pub modules: Vec<ManifestEntry>,
}

impl ModuleManifest {
    /// Parse a manifest; JSON and YAML are both accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let manifest: ModuleManifest = match serde_json::from_str(raw) {
            Ok(manifest) => manifest,
            Err(_) => serde_yaml::from_str(raw).context("parse module manifest")?,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate required fields and id uniqueness.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (i, entry) in self.modules.iter().enumerate() {
            if entry.id.trim().is_empty() {
                bail!("Module manifest entry #{i} is missing 'id'");
            }
            if entry.entry_class.trim().is_empty() {
                bail!("Module '{}' is missing 'entryClass'", entry.id);
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("Module '{}' is declared more than once", entry.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modhost_core::EventKind;

    const YAML: &str = r#"
modules:
  - id: greeter
    name: Greeter
    version: "1.2.0"
    entryClass: demo.Greeter
    handlers:
      - className: demo.Greeter
        entryPoint: on_setup
        kinds: [common_setup]
  - id: quiet
    name: Quiet
    entryClass: demo.Quiet
"#;

    #[test]
    fn parses_yaml_manifest() {
        let manifest = ModuleManifest::parse(YAML).unwrap();
        assert_eq!(manifest.modules.len(), 2);
        let greeter = &manifest.modules[0];
        assert_eq!(greeter.descriptor().version.as_deref(), Some("1.2.0"));
        assert_eq!(greeter.scan_data().handlers[0].kinds, vec![EventKind::CommonSetup]);
        assert!(manifest.modules[1].scan_data().is_empty());
    }

    #[test]
    fn parses_json_manifest() {
        let raw = r#"{"modules":[{"id":"a","name":"A","entryClass":"demo.A"}]}"#;
        let manifest = ModuleManifest::parse(raw).unwrap();
        assert_eq!(manifest.modules[0].entry_class, "demo.A");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = r#"{"modules":[
            {"id":"a","name":"A","entryClass":"demo.A"},
            {"id":"a","name":"A again","entryClass":"demo.A"}
        ]}"#;
        let err = ModuleManifest::parse(raw).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_missing_entry_class() {
        let raw = r#"{"modules":[{"id":"a","name":"A","entryClass":" "}]}"#;
        assert!(ModuleManifest::parse(raw).is_err());
    }
}

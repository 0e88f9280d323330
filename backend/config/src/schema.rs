//! Typed configuration schema.
//!
//! Every section is optional on disk; [`crate::defaults`] fills in what is
//! missing after loading.

use modhost_core::LoadingStage;
use serde::{Deserialize, Serialize};

/// Root of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModHostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<BusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling log file. Relative paths resolve against
    /// the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit JSON on the console as well as in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    /// Let module buses carry custom events besides the lifecycle kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_custom_events: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<LoadingStage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_on_first_failure: Option<bool>,
}

impl ModHostConfig {
    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(crate::defaults::DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .unwrap_or(crate::defaults::DEFAULT_LOG_DIR)
    }

    pub fn json_console(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn accept_custom_events(&self) -> bool {
        self.bus.as_ref().and_then(|b| b.accept_custom_events).unwrap_or(false)
    }

    pub fn stages(&self) -> Vec<LoadingStage> {
        self.loader
            .as_ref()
            .and_then(|l| l.stages.clone())
            .unwrap_or_else(|| LoadingStage::ALL.to_vec())
    }

    pub fn abort_on_first_failure(&self) -> bool {
        self.loader.as_ref().and_then(|l| l.abort_on_first_failure).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_sections() {
        let raw = r#"
logging:
  level: debug
  json: true
bus:
  acceptCustomEvents: true
loader:
  stages: [construct, common_setup]
  abortOnFirstFailure: true
"#;
        let config: ModHostConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.log_level(), "debug");
        assert!(config.json_console());
        assert!(config.accept_custom_events());
        assert_eq!(config.stages(), vec![LoadingStage::Construct, LoadingStage::CommonSetup]);
        assert!(config.abort_on_first_failure());
    }

    #[test]
    fn empty_config_falls_back_on_accessors() {
        let config = ModHostConfig::default();
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.log_dir(), "logs");
        assert!(!config.accept_custom_events());
        assert_eq!(config.stages(), LoadingStage::ALL.to_vec());
    }
}

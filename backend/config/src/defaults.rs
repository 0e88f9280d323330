//! Config defaults: applies default values to a parsed config.

use crate::schema::{BusConfig, LoaderConfig, LoggingConfig, ModHostConfig};
use modhost_core::LoadingStage;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Relative to the config directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ModHostConfig) -> ModHostConfig {
    let config = apply_logging_defaults(config);
    let config = apply_bus_defaults(config);
    apply_loader_defaults(config)
}

fn apply_logging_defaults(mut config: ModHostConfig) -> ModHostConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.dir.is_none() {
        logging.dir = Some(DEFAULT_LOG_DIR.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

fn apply_bus_defaults(mut config: ModHostConfig) -> ModHostConfig {
    let bus = config.bus.get_or_insert_with(BusConfig::default);
    if bus.accept_custom_events.is_none() {
        bus.accept_custom_events = Some(false);
    }
    config
}

/// Missing stages mean the full lifecycle.
fn apply_loader_defaults(mut config: ModHostConfig) -> ModHostConfig {
    let loader = config.loader.get_or_insert_with(LoaderConfig::default);
    if loader.stages.is_none() {
        loader.stages = Some(LoadingStage::ALL.to_vec());
    }
    if loader.abort_on_first_failure.is_none() {
        loader.abort_on_first_failure = Some(false);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let config = apply_all_defaults(ModHostConfig::default());
        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("info"));
        assert_eq!(logging.dir.as_deref(), Some("logs"));
        assert_eq!(config.bus.unwrap().accept_custom_events, Some(false));
        let loader = config.loader.unwrap();
        assert_eq!(loader.stages.unwrap().len(), LoadingStage::ALL.len());
        assert_eq!(loader.abort_on_first_failure, Some(false));
    }

    #[test]
    fn keeps_explicit_values() {
        let config = ModHostConfig {
            logging: Some(LoggingConfig { level: Some("trace".into()), ..Default::default() }),
            loader: Some(LoaderConfig {
                stages: Some(vec![LoadingStage::Construct]),
                abort_on_first_failure: Some(true),
            }),
            ..Default::default()
        };
        let config = apply_all_defaults(config);
        assert_eq!(config.log_level(), "trace");
        assert_eq!(config.stages(), vec![LoadingStage::Construct]);
        assert!(config.abort_on_first_failure());
    }
}

//! Config validation with user-friendly error messages.

use crate::schema::ModHostConfig;
use modhost_core::LoadingStage;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

pub fn validate(config: &ModHostConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_logging(config, &mut report);
    validate_loader(config, &mut report);
    report
}

fn validate_logging(config: &ModHostConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        // Full EnvFilter directives ("modhost=debug,info") are allowed; bare
        // words must be a known level.
        if !level.contains('=') && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error("logging.level", format!("Unknown log level '{level}'"));
        }
    }
    if logging.dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
        report.error("logging.dir", "Log directory cannot be empty");
    }
}

fn validate_loader(config: &ModHostConfig, report: &mut ValidationReport) {
    let Some(stages) = config.loader.as_ref().and_then(|l| l.stages.as_ref()) else { return };
    let path = "loader.stages";
    match stages.first() {
        None => report.error(path, "At least one stage is required"),
        Some(first) if *first != LoadingStage::Construct => {
            report.error(path, format!("Stages must start with 'construct', found '{first}'"))
        }
        Some(_) => {}
    }
    for pair in stages.windows(2) {
        if pair[1] <= pair[0] {
            report.error(path, format!("Stage '{}' does not follow '{}'", pair[1], pair[0]));
        }
    }
    if stages.last().is_some_and(|s| *s != LoadingStage::Done) {
        report.warn(path, "Modules will not reach the 'done' stage");
    }
}

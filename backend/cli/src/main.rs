mod demo;
mod run_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use modhost_config::{config_dir, config_file_path, load_and_prepare};
use modhost_logging::init_logger;
use modhost_modules::ModuleManifest;

#[derive(Parser)]
#[command(name = "modhost")]
#[command(about = "Loads modules and drives them through their lifecycle")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the modules listed in a manifest
    Run {
        /// YAML or JSON module manifest
        #[arg(short, long)]
        manifest: PathBuf,
        /// Config file (defaults to $MODHOST_CONFIG_DIR/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the built-in module classes
    Classes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { manifest, config } => run(&manifest, config).await,
        Commands::Classes => {
            let classes = demo::builtin_classes()?;
            let rows: Vec<Vec<String>> = classes
                .names()
                .into_iter()
                .filter_map(|name| classes.resolve(name))
                .map(|class| {
                    let mut entries: Vec<&str> = class.entry_points().collect();
                    entries.sort();
                    vec![class.name().to_string(), entries.join(", ")]
                })
                .collect();
            print!("{}", terminal_output::render_table(&["Class", "Entry points"], &rows));
            Ok(())
        }
    }
}

async fn run(manifest_path: &Path, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&config_path).await?;

    let log_dir = resolve_log_dir(&config_path, config.log_dir());
    init_logger(&log_dir, config.log_level(), config.json_console());
    info!(config = %config_path.display(), logs = %log_dir.display(), "Starting modhost");

    let raw = tokio::fs::read_to_string(manifest_path)
        .await
        .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;
    let manifest = ModuleManifest::parse(&raw)?;

    let classes = demo::builtin_classes()?;
    let (_containers, report) = run_cmd::load_modules(&manifest, &config, &classes)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(stage) = report.aborted_at {
        terminal_output::note_warn(&format!("Load aborted after stage '{stage}'"));
    }
    if !report.is_success() {
        for failure in &report.failures {
            terminal_output::note_error(&format!("{}: {}", failure.module_id, failure.causes.join(": ")));
        }
        bail!("{} module(s) failed to load", report.failures.len());
    }
    terminal_output::note_success(&format!("{} module(s) loaded", report.modules.len()));
    Ok(())
}

/// Relative log directories live next to the config file.
fn resolve_log_dir(config_path: &Path, log_dir: &str) -> PathBuf {
    let dir = Path::new(log_dir);
    match config_path.parent() {
        Some(parent) if dir.is_relative() => parent.join(dir),
        _ => dir.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_log_dir_follows_config_file() {
        let dir = resolve_log_dir(Path::new("/etc/modhost/config.yaml"), "logs");
        assert_eq!(dir, PathBuf::from("/etc/modhost/logs"));
        assert_eq!(resolve_log_dir(Path::new("/etc/modhost/config.yaml"), "/var/log"), PathBuf::from("/var/log"));
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from(["modhost", "run", "--manifest", "mods.yaml"]).unwrap();
        match cli.command {
            Commands::Run { manifest, config } => {
                assert_eq!(manifest, PathBuf::from("mods.yaml"));
                assert!(config.is_none());
            }
            Commands::Classes => panic!("expected run"),
        }
    }

    #[tokio::test]
    async fn run_fails_when_a_module_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        let manifest = dir.path().join("modules.json");
        std::fs::write(&config, "logging:\n  level: warn\n").unwrap();
        std::fs::write(
            &manifest,
            r#"{"modules":[{"id":"bad","name":"Bad","entryClass":"demo.Faulty",
                "handlers":[{"className":"demo.Faulty","entryPoint":"explode"}]}]}"#,
        )
        .unwrap();

        let err = run(&manifest, Some(config)).await.unwrap_err();
        assert!(err.to_string().contains("1 module(s) failed"));
    }
}

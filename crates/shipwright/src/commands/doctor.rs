//! Doctor command: diagnose configuration and environment.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use shipwright_core::config;
use tracing::{debug, instrument};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to the project config file, if any
    file: Option<String>,
    /// Whether a project config file was found
    found: bool,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    /// `None` when unset; secrets are reported as `(set)`.
    value: Option<String>,
    description: &'static str,
}

impl EnvVar {
    fn plain(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            value: std::env::var(name).ok(),
            description,
        }
    }

    fn secret(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            value: std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|_| "(set)".to_string()),
            description,
        }
    }
}

impl DoctorReport {
    fn gather(cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: vec![
                    EnvVar::secret("GITHUB_ACCESS_TOKEN", "GitHub API token"),
                    EnvVar::secret("NPM_TOKEN", "npm registry token"),
                    EnvVar::plain("GITHUB_OUTPUT", "CI step output file"),
                    EnvVar::plain("XDG_CONFIG_HOME", "Override config directory"),
                    EnvVar::plain("SHIPWRIGHT_LOG_PATH", "Explicit log file path"),
                    EnvVar::plain("SHIPWRIGHT_LOG_DIR", "Log directory"),
                    EnvVar::plain("RUST_LOG", "Log filter directive"),
                ],
            },
        }
    }
}

/// Run diagnostics and report configuration status.
#[instrument(name = "cmd_doctor", skip_all)]
pub fn cmd_doctor(_args: DoctorArgs, global_json: bool, cwd: &camino::Utf8Path) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Logs", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());
    for var in &report.environment.env_vars {
        match var.value.as_deref() {
            Some(value) => println!("  {}: {}", var.name.dimmed(), value.cyan()),
            None => println!(
                "  {}: {} {}",
                var.name.dimmed(),
                "(unset)".yellow(),
                format!("({})", var.description).dimmed()
            ),
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");
    if config_path.exists() || !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&starter_config())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}

/// Defaults spelled out, so the file documents what can be changed.
fn starter_config() -> config::Config {
    let defaults = config::Config::default();
    config::Config {
        github: Some(config::GitHubConfig {
            api_url: Some(defaults.api_url().to_string()),
        }),
        dist: Some(config::DistConfig {
            dir: Some(defaults.dist_dir()),
        }),
        commands: Some(config::CommandsConfig {
            twine: Some(defaults.twine_cmd().to_string()),
            npm: Some(defaults.npm_cmd().to_string()),
            ..config::CommandsConfig::default()
        }),
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_doctor_json_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), true, &test_cwd()).is_ok());
    }

    #[test]
    fn test_doctor_report_gathers() {
        let report = DoctorReport::gather(&test_cwd());
        assert!(report.directories.config.is_some() || report.directories.cache.is_some());
        assert!(report.environment.env_vars.iter().any(|v| v.name == "GITHUB_ACCESS_TOKEN"));
    }

    #[test]
    fn test_secret_values_are_masked() {
        let var = EnvVar::secret("PATH", "anything set");
        assert_eq!(var.value.as_deref(), Some("(set)"));
    }

    #[test]
    fn test_starter_config_is_valid_yaml_config() {
        let yaml = serde_saphyr::to_string(&starter_config()).unwrap();
        assert!(yaml.contains("twine upload"), "{yaml}");
        assert!(starter_config().validate().is_ok());
    }
}

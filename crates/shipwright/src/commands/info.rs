//! Info command: show package and effective configuration.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use shipwright_core::config::{self, Config};
use shipwright_core::output;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    api_url: String,
    dist_dir: String,
    twine_cmd: String,
    npm_cmd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_python: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_npm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let checkers = config.checkers();
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            api_url: config.api_url().to_string(),
            dist_dir: config.dist_dir().to_string(),
            twine_cmd: config.twine_cmd().to_string(),
            npm_cmd: config.npm_cmd().to_string(),
            check_python: checkers.python,
            check_npm: checkers.npm,
            output_file: output::output_target(config.output_file()).map(|p| p.to_string()),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
}

/// Print package information and the effective configuration.
#[instrument(name = "cmd_info", skip_all)]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.package.name.bold(), info.package.version.green());
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), info.package.repository.cyan());
    }

    let c = &info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    match c.config_file {
        Some(ref path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), c.log_level);
    if let Some(ref dir) = c.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "GitHub API".dimmed(), c.api_url.cyan());
    println!("{}: {}", "Dist directory".dimmed(), c.dist_dir.cyan());

    println!();
    println!("{}", "Commands".bold().underline());
    println!("{}: {}", "Python upload".dimmed(), c.twine_cmd.cyan());
    println!("{}: {}", "npm publish".dimmed(), c.npm_cmd.cyan());
    if let Some(ref cmd) = c.check_python {
        println!("{}: {}", "Python check".dimmed(), cmd.cyan());
    }
    if let Some(ref cmd) = c.check_npm {
        println!("{}: {}", "npm check".dimmed(), cmd.cyan());
    }
    if let Some(ref file) = c.output_file {
        println!("{}: {}", "Output file".dimmed(), file);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_info_text_succeeds() {
        assert!(cmd_info(InfoArgs::default(), false, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_cmd_info_json_via_global() {
        assert!(cmd_info(InfoArgs::default(), true, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_config_info_defaults() {
        let cwd = camino::Utf8PathBuf::from("/nonexistent");
        let info = ConfigInfo::from_config(&Config::default(), &cwd);
        assert!(info.config_file.is_none());
        assert_eq!(info.log_level, "info");
        assert_eq!(info.api_url, "https://api.github.com");
        assert_eq!(info.twine_cmd, "twine upload");
        assert!(info.check_python.is_none());
    }
}

//! Preflight command: validate release readiness.

use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipwright_core::command::ShellRunner;
use shipwright_core::config::{Config, DistConfig};
use shipwright_core::preflight;

use super::GitHubArgs;

/// Arguments for the `preflight` subcommand.
#[derive(Args, Debug, Default)]
pub struct PreflightArgs {
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Directory holding the distributions to check
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,
}

/// Run preflight checks and display results.
#[instrument(name = "cmd_preflight", skip_all)]
pub fn cmd_preflight(
    args: PreflightArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing preflight command");

    let mut config = config.clone();
    if let Some(dir) = args.dist_dir {
        config.dist = Some(DistConfig { dir: Some(dir) });
    }
    let token_present = args.github.auth.as_deref().is_some_and(|t| !t.is_empty());
    let report = preflight::run_preflight(&ShellRunner, cwd, &config, token_present);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Preflight Checks".bold().underline());
        println!();

        for check in &report.checks {
            let icon = if check.passed {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            };
            println!("  {icon} {}: {}", check.name.bold(), check.message);
        }

        println!();
        if report.all_passed {
            println!("  {}", "Ready to release!".green().bold());
        } else {
            let failed = report.checks.iter().filter(|c| !c.passed).count();
            println!(
                "  {}: fix the issues above before releasing",
                format!("{failed} check(s) failed").red().bold(),
            );
        }
    }

    if report.all_passed {
        Ok(())
    } else {
        Err(anyhow::anyhow!("preflight checks failed"))
    }
}

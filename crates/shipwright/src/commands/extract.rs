//! Extract command: thin CLI layer over `shipwright_core::extract`.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipwright_core::command::ShellRunner;
use shipwright_core::config::Config;
use shipwright_core::extract::{self, ExtractOptions};

use super::{GitHubArgs, Progress};

/// Arguments for the `extract-release` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Release URL: HTML tag URL or API release URL
    #[arg(value_name = "RELEASE_URL")]
    pub reference: String,

    #[command(flatten)]
    pub github: GitHubArgs,

    /// Staging directory (wiped before download)
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Download and check, but skip checksum verification
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the extract-release command.
#[instrument(name = "cmd_extract", skip_all, fields(reference = %args.reference))]
pub fn cmd_extract(
    args: ExtractArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, dry_run = args.dry_run, "executing extract command");

    let client = args.github.client(config);
    let options = ExtractOptions {
        staging: super::dist_dir(cwd, args.dist_dir.as_deref(), config),
        dry_run: args.dry_run,
        checkers: config.checkers(),
    };

    let mut progress = Progress::new(!global_json, args.dry_run);
    let outcome = extract::extract_release(&client, &ShellRunner, &args.reference, &options, |event| {
        progress.handle(event);
    })
    .context("extract failed")?;
    drop(progress);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let verdict = if outcome.verified {
            "verified".green().to_string()
        } else {
            "not verified (dry run)".yellow().to_string()
        };
        eprintln!(
            "{} Extracted {} assets of {} into {}: {verdict}",
            "✓".green().bold(),
            outcome.assets.len(),
            outcome.tag.bold(),
            outcome.staging.cyan(),
        );
    }

    super::report_release_url(&outcome.release_url, config, global_json)
}

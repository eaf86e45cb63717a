//! Publish command: thin CLI layer over `shipwright_core::publish`.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipwright_core::command::ShellRunner;
use shipwright_core::config::Config;
use shipwright_core::publish::{self, PublishOptions};

use super::{GitHubArgs, Progress};

/// Arguments for the `publish-release` subcommand.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Release URL: HTML tag URL or API release URL
    #[arg(value_name = "RELEASE_URL")]
    pub reference: String,

    #[command(flatten)]
    pub github: GitHubArgs,

    /// Directory holding the extracted assets
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// npm token written to .npmrc in the staging directory
    #[arg(long, env = "NPM_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub npm_token: Option<String>,

    /// Upload command for wheels and sdists
    #[arg(long, value_name = "CMD")]
    pub twine_cmd: Option<String>,

    /// Publish command for npm tarballs
    #[arg(long, value_name = "CMD")]
    pub npm_cmd: Option<String>,

    /// Run the uploads but leave the release in draft
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the publish-release command.
#[instrument(name = "cmd_publish", skip_all, fields(reference = %args.reference))]
pub fn cmd_publish(
    args: PublishArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, dry_run = args.dry_run, "executing publish command");

    let client = args.github.client(config);
    let options = PublishOptions {
        staging: super::dist_dir(cwd, args.dist_dir.as_deref(), config),
        npm_token: args.npm_token.filter(|t| !t.is_empty()),
        twine_cmd: args.twine_cmd.unwrap_or_else(|| config.twine_cmd().to_string()),
        npm_cmd: args.npm_cmd.unwrap_or_else(|| config.npm_cmd().to_string()),
        dry_run: args.dry_run,
    };

    if args.dry_run && !global_json {
        eprintln!("\n{}", "DRY RUN: the release stays a draft".yellow().bold());
    }

    let mut progress = Progress::new(!global_json, args.dry_run);
    let outcome = publish::publish_release(&client, &ShellRunner, &args.reference, &options, |event| {
        progress.handle(event);
    })
    .context("publish failed")?;
    drop(progress);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for file in &outcome.published {
            eprintln!("    {} {}", "→".dimmed(), file.command.cyan());
        }
        for name in &outcome.skipped {
            eprintln!("    {} {}", "skipped".yellow(), name.dimmed());
        }
        eprintln!(
            "{} Published {} files{}",
            "✓".green().bold(),
            outcome.published.len(),
            if outcome.draft { " (release left in draft)" } else { "" },
        );
    }

    super::report_release_url(&outcome.release_url, config, global_json)
}

//! Delete command: remove a release and all of its assets.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipwright_core::config::Config;
use shipwright_core::delete;

use super::{GitHubArgs, Progress};

/// Arguments for the `delete-release` subcommand.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Release URL: HTML tag URL or API release URL
    #[arg(value_name = "RELEASE_URL")]
    pub reference: String,

    #[command(flatten)]
    pub github: GitHubArgs,
}

/// Execute the delete-release command.
///
/// There is no confirmation step; the release and its assets are gone once
/// this returns.
#[instrument(name = "cmd_delete", skip_all, fields(reference = %args.reference))]
pub fn cmd_delete(args: DeleteArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing delete command");

    let client = args.github.client(config);
    let mut progress = Progress::new(!global_json, false);
    let outcome = delete::delete_release(&client, &args.reference, |event| progress.handle(event))
        .context("delete failed")?;
    drop(progress);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        eprintln!(
            "{} Deleted release {} and {} assets",
            "✓".green().bold(),
            outcome.tag.bold(),
            outcome.assets.len(),
        );
    }

    super::report_release_url(&outcome.release_url, config, global_json)
}

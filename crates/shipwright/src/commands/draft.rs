//! Draft command: create a draft release and attach the built assets.

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::Args;
use inquire::Text;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use shipwright_core::command::ShellRunner;
use shipwright_core::config::Config;
use shipwright_core::draft::{self, DraftOptions};
use shipwright_core::reference::RepoId;

use super::{GitHubArgs, Progress};

/// Arguments for the `draft-release` subcommand.
#[derive(Args, Debug)]
pub struct DraftArgs {
    /// Files to attach (default: every file in the dist directory)
    #[arg(value_name = "ASSET")]
    pub assets: Vec<Utf8PathBuf>,

    #[command(flatten)]
    pub github: GitHubArgs,

    /// Release tag, e.g. v1.2.0 (prompted for when interactive)
    #[arg(long)]
    pub tag: Option<String>,

    /// Repository as owner/name (default: parsed from the remote)
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Remote used to infer the repository
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Target branch (default: the current branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Release title (default: "Release <tag>")
    #[arg(long)]
    pub title: Option<String>,

    /// File holding the release notes
    #[arg(long, value_name = "FILE")]
    pub body_file: Option<Utf8PathBuf>,

    /// Directory holding the built distributions
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Mark as pre-release (default: detected from the tag)
    #[arg(long, conflicts_with = "no_prerelease")]
    pub prerelease: bool,

    /// Mark as a full release even if the tag looks like a pre-release
    #[arg(long, conflicts_with = "prerelease")]
    pub no_prerelease: bool,

    /// Show what would be created without calling the API
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the draft-release command.
#[instrument(name = "cmd_draft", skip_all)]
pub fn cmd_draft(
    args: DraftArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, dry_run = args.dry_run, "executing draft command");

    let tag = match args.tag {
        Some(tag) => tag,
        None if super::interactive(global_json) => Text::new("Release tag:")
            .with_help_message("e.g. v1.2.0")
            .prompt()
            .context("tag prompt cancelled")?,
        None => bail!("--tag is required when not running interactively"),
    };
    let tag = tag.trim().to_string();
    if tag.is_empty() {
        bail!("release tag must not be empty");
    }

    let repo = match args.repo.as_deref() {
        Some(slug) => RepoId::from_slug(slug)
            .with_context(|| format!("invalid --repo {slug:?}, expected owner/name"))?,
        None => draft::repo_from_remote(&ShellRunner, cwd, &args.remote)?,
    };
    let branch = match args.branch {
        Some(branch) => branch,
        None => draft::branch_from_head(&ShellRunner, cwd)?,
    };
    let body = match args.body_file {
        Some(ref path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
        }
        None => String::new(),
    };
    let assets = if args.assets.is_empty() {
        let dir = super::dist_dir(cwd, args.dist_dir.as_deref(), config);
        draft::default_assets(&dir)?
    } else {
        args.assets.iter().map(|a| cwd.join(a)).collect()
    };
    let prerelease = if args.prerelease {
        Some(true)
    } else if args.no_prerelease {
        Some(false)
    } else {
        None
    };

    let options = DraftOptions {
        repo,
        tag,
        branch,
        title: args.title,
        body,
        assets,
        prerelease,
    };

    if args.dry_run {
        print_plan(&options);
        return Ok(());
    }

    let client = args.github.client(config);
    let mut progress = Progress::new(!global_json, false);
    let outcome = draft::draft_release(&client, &options, |event| progress.handle(event))
        .context("draft release failed")?;
    drop(progress);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        eprintln!(
            "{} Drafted {}{} with {} assets",
            "✓".green().bold(),
            outcome.tag.bold(),
            if outcome.prerelease { " (pre-release)" } else { "" },
            outcome.assets.len(),
        );
    }

    super::report_release_url(&outcome.release_url, config, global_json)
}

fn print_plan(options: &DraftOptions) {
    let prerelease = options
        .prerelease
        .unwrap_or_else(|| draft::is_prerelease(&options.tag));
    eprintln!("\n{}", "DRY RUN: no release will be created".yellow().bold());
    eprintln!("  {}: {}", "Repository".dimmed(), options.repo.to_string().cyan());
    eprintln!("  {}: {} from {}", "Tag".dimmed(), options.tag.cyan(), options.branch.cyan());
    eprintln!("  {}: {}", "Pre-release".dimmed(), prerelease);
    for asset in &options.assets {
        eprintln!("    {} {}", "asset →".dimmed(), asset);
    }
}

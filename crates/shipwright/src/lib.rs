//! Library interface for the `shipwright` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    GITHUB_ACCESS_TOKEN     GitHub token (same as --auth)
    NPM_TOKEN               npm token for publish-release (same as --npm-token)
    GITHUB_OUTPUT           File that receives release_url=<url>
    RUST_LOG                Log filter (e.g., debug, shipwright=trace)
    SHIPWRIGHT_LOG_PATH     Explicit log file path
    SHIPWRIGHT_LOG_DIR      Log directory
";
/// Command-line interface definition for shipwright.
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(about = "Verify and publish GitHub draft releases to PyPI and npm", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Download, check, and verify the assets of a draft release
    ExtractRelease(commands::extract::ExtractArgs),

    /// Upload extracted assets to PyPI/npm and publish the release
    PublishRelease(commands::publish::PublishArgs),

    /// Delete a release and all of its assets
    DeleteRelease(commands::delete::DeleteArgs),

    /// Create a draft release and attach assets
    DraftRelease(commands::draft::DraftArgs),

    /// Print checksum lines for the release commit message
    Checksums(commands::checksums::ChecksumsArgs),

    /// Check release readiness
    Preflight(commands::preflight::PreflightArgs),

    /// Diagnose configuration and environment
    Doctor(commands::doctor::DoctorArgs),

    /// Show package information
    Info(commands::info::InfoArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_extract_release() {
        let cli = Cli::try_parse_from([
            "shipwright",
            "extract-release",
            "https://github.com/foo/bar/releases/tag/v1.0.0",
            "--dist-dir",
            "out",
            "--dry-run",
        ])
        .unwrap();
        let Commands::ExtractRelease(args) = cli.command else {
            panic!("expected extract-release");
        };
        assert!(args.dry_run);
        assert_eq!(args.dist_dir.as_deref().map(camino::Utf8Path::as_str), Some("out"));
    }

    #[test]
    fn draft_prerelease_flags_conflict() {
        let result = Cli::try_parse_from([
            "shipwright",
            "draft-release",
            "--tag",
            "v1.0.0",
            "--prerelease",
            "--no-prerelease",
        ]);
        assert!(result.is_err());
    }
}

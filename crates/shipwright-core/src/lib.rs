//! Core library for shipwright.
//!
//! Moves a release from GitHub draft to published packages: a draft
//! release's assets are downloaded, checked, and verified against the
//! checksums recorded in the tagged commit's message, then uploaded to
//! PyPI and npm before the release is taken out of draft.
//!
//! # Modules
//!
//! - [`extract`] - Download, check, and verify a draft release's assets
//! - [`publish`] - Upload staged assets and finalize the release
//! - [`delete`] - Remove a release and its assets
//! - [`draft`] - Create a draft release and attach assets
//! - [`manifest`] - Checksum lines for the release commit message
//! - [`preflight`] - Release readiness checks
//! - [`github`] - GitHub Releases API client and the [`github::ReleaseStore`] seam
//! - [`command`] - Shell command execution behind [`command::CommandRunner`]
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```no_run
//! use shipwright_core::command::ShellRunner;
//! use shipwright_core::extract::{extract_release, options_for};
//! use shipwright_core::github::GitHubClient;
//! use shipwright_core::ConfigLoader;
//!
//! let config = ConfigLoader::new().load().expect("Failed to load configuration");
//! let client = GitHubClient::new(config.api_url(), std::env::var("GITHUB_ACCESS_TOKEN").ok());
//! let options = options_for(&config.dist_dir(), false, config.checkers());
//!
//! let outcome = extract_release(
//!     &client,
//!     &ShellRunner,
//!     "https://github.com/foo/bar/releases/tag/v1.0.0",
//!     &options,
//!     |_| {},
//! )
//! .expect("extract failed");
//! println!("{}", outcome.release_url);
//! ```
#![deny(unsafe_code)]

pub mod checksum;

pub mod command;

pub mod config;

pub mod delete;

pub mod dist;

pub mod draft;

pub mod error;

pub mod event;

pub mod extract;

pub mod fetch;

pub mod git;

pub mod github;

pub mod locate;

pub mod manifest;

pub mod output;

pub mod preflight;

pub mod publish;

pub mod reference;

pub mod verify;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;

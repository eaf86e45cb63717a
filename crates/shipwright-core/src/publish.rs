//! Publish staged assets to package registries and finalize the release.
//!
//! Wheels and sdists go through the package-index upload command, npm
//! tarballs through the registry publish command. Each command runs in the
//! staging directory with the bare file name as its last argument (or in
//! place of `{file}`). Only when at least one file was uploaded is the
//! release taken out of draft.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::command::{CommandError, CommandRunner, render_template};
use crate::dist::DistKind;
use crate::event::{ReleaseEvent, ReleaseStep, StepOutcome};
use crate::github::{GitHubError, ReleaseStore, ReleaseUpdate};
use crate::locate::{LocateError, locate_release};
use crate::reference::{ReferenceError, ReleaseRef};

/// Default package-index upload command.
pub const DEFAULT_TWINE_CMD: &str = "twine upload";

/// Default npm registry publish command.
pub const DEFAULT_NPM_CMD: &str = "npm publish";

const NPM_REGISTRY: &str = "//registry.npmjs.org/";

/// Errors from publishing a release.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The release reference is malformed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Nothing in the staging directory was uploadable.
    #[error("no assets published, refusing to finalize release")]
    NoAssetsPublished,

    /// The staging directory could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An upload command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The release could not be located.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Updating the release failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Result alias for publishing.
pub type PublishResult<T> = Result<T, PublishError>;

/// Options for [`publish_release`].
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Directory holding the verified assets.
    pub staging: Utf8PathBuf,
    /// npm token written to `<staging>/.npmrc` when present.
    pub npm_token: Option<String>,
    /// Upload command template for Python distributions.
    pub twine_cmd: String,
    /// Publish command template for npm tarballs.
    pub npm_cmd: String,
    /// Keep the release in draft after uploading.
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            staging: Utf8PathBuf::from("dist"),
            npm_token: None,
            twine_cmd: DEFAULT_TWINE_CMD.to_string(),
            npm_cmd: DEFAULT_NPM_CMD.to_string(),
            dry_run: false,
        }
    }
}

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedFile {
    /// File name inside the staging directory.
    pub name: String,
    /// Distribution kind.
    pub kind: DistKind,
    /// Command line that uploaded it.
    pub command: String,
}

/// What a publish run did.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    /// Web URL of the release.
    pub release_url: String,
    /// Uploaded files, in name order.
    pub published: Vec<PublishedFile>,
    /// Files that matched no upload command.
    pub skipped: Vec<String>,
    /// Draft flag the release was left with.
    pub draft: bool,
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
///
/// A missing directory stages nothing.
pub fn staged_files(dir: &Utf8Path) -> std::io::Result<Vec<String>> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() || entry.file_name().starts_with('.') {
            continue;
        }
        names.push(entry.file_name().to_string());
    }
    names.sort();
    Ok(names)
}

/// Write an npm auth config for the public registry into `dir`.
pub fn write_npmrc(dir: &Utf8Path, token: &str) -> std::io::Result<Utf8PathBuf> {
    let path = dir.join(".npmrc");
    fs::write(&path, format!("{NPM_REGISTRY}:_authToken={token}\n"))?;
    debug!(%path, "wrote npm auth config");
    Ok(path)
}

/// Upload every staged distribution, then take the release out of draft
/// (or keep it in draft for a dry run).
///
/// # Errors
///
/// [`PublishError::NoAssetsPublished`] when no staged file is uploadable,
/// checked before any API call. Otherwise any reference, command, or API
/// failure.
#[instrument(skip(store, runner, options, on_event), fields(dry_run = options.dry_run))]
pub fn publish_release(
    store: &dyn ReleaseStore,
    runner: &dyn CommandRunner,
    reference: &str,
    options: &PublishOptions,
    mut on_event: impl FnMut(ReleaseEvent),
) -> PublishResult<PublishOutcome> {
    let reference = ReleaseRef::parse(reference)?;
    let staging = &options.staging;
    let io_err = |source| PublishError::Io {
        path: staging.clone(),
        source,
    };

    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for name in staged_files(staging).map_err(io_err)? {
        match DistKind::from_name(&name) {
            DistKind::Other => {
                info!(file = %name, "nothing to upload");
                skipped.push(name);
            }
            kind => planned.push((name, kind)),
        }
    }
    if planned.is_empty() {
        return Err(PublishError::NoAssetsPublished);
    }

    if let Some(token) = options.npm_token.as_deref().filter(|t| !t.is_empty())
        && planned.iter().any(|(_, kind)| *kind == DistKind::Npm)
    {
        write_npmrc(staging, token).map_err(io_err)?;
    }

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Upload));
    let mut published = Vec::new();
    for (name, kind) in planned {
        let template = if kind.is_python() {
            &options.twine_cmd
        } else {
            &options.npm_cmd
        };

        on_event(ReleaseEvent::Item {
            step: ReleaseStep::Upload,
            name: name.clone(),
        });
        let command = render_template(template, &name);
        runner.run(&command, staging)?;
        info!(file = %name, %kind, "uploaded");
        published.push(PublishedFile {
            name,
            kind,
            command,
        });
    }

    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Upload,
        StepOutcome::success(format!("{} files", published.len())),
    ));

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Finalize));
    let release = locate_release(store, &reference)?;
    let update = ReleaseUpdate::with_draft(&release, options.dry_run);
    let updated = store.update_release(reference.repo(), release.id, &update)?;
    let message = if updated.draft {
        "release left in draft"
    } else {
        "release published"
    };
    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Finalize,
        StepOutcome::success(message),
    ));

    Ok(PublishOutcome {
        release_url: updated.html_url,
        published,
        skipped,
        draft: updated.draft,
    })
}

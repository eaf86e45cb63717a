//! Create a draft release and attach its assets.
//!
//! This is the step that produces what [`extract`](crate::extract) later
//! consumes: a draft release whose tag points at a commit listing the asset
//! checksums (see [`manifest`](crate::manifest)).

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::command::CommandRunner;
use crate::event::{ReleaseEvent, ReleaseStep, StepOutcome};
use crate::git::{self, GitError};
use crate::github::{GitHubError, NewRelease, ReleaseStore};
use crate::publish::staged_files;
use crate::reference::RepoId;

/// Errors from drafting a release.
#[derive(Error, Debug)]
pub enum DraftError {
    /// Reading the local repository failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The repository could not be determined from the remote.
    #[error("cannot determine repository from remote {0}; pass --repo owner/name")]
    UnknownRepo(String),

    /// HEAD is detached and no branch was given.
    #[error("HEAD is detached; pass --branch")]
    DetachedHead,

    /// An asset file could not be read.
    #[error("{path}: {source}")]
    Io {
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Creating the release or uploading an asset failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Result alias for drafting.
pub type DraftResult<T> = Result<T, DraftError>;

/// Options for [`draft_release`].
#[derive(Debug, Clone)]
pub struct DraftOptions {
    /// Target repository.
    pub repo: RepoId,
    /// Tag to create the release for.
    pub tag: String,
    /// Branch the tag is created from.
    pub branch: String,
    /// Release title; defaults to `Release <tag>`.
    pub title: Option<String>,
    /// Release notes.
    pub body: String,
    /// Files to attach.
    pub assets: Vec<Utf8PathBuf>,
    /// Pre-release flag; detected from the tag when unset.
    pub prerelease: Option<bool>,
}

/// What a draft run created.
#[derive(Debug, Clone, Serialize)]
pub struct DraftOutcome {
    /// Web URL of the new release.
    pub release_url: String,
    /// Numeric release id.
    pub id: u64,
    /// Release tag.
    pub tag: String,
    /// Whether the release was marked as a pre-release.
    pub prerelease: bool,
    /// Uploaded asset names.
    pub assets: Vec<String>,
}

/// Whether a version or tag denotes a pre-release.
///
/// Semver versions are pre-releases when they carry a pre-release part
/// (`1.0.0-rc.1`). Anything else is treated as a PEP 440 style version,
/// where any letter marks a pre-release (`1.0.0a1`, `1.0.0rc2`, `1.0.0.dev1`).
pub fn is_prerelease(version: &str) -> bool {
    let version = version.trim().trim_start_matches('v');
    match semver::Version::parse(version) {
        Ok(parsed) => !parsed.pre.is_empty(),
        Err(_) => version.chars().any(|c| c.is_ascii_alphabetic()),
    }
}

/// Determine the repository from a git remote of the checkout at `cwd`.
pub fn repo_from_remote(runner: &dyn CommandRunner, cwd: &Utf8Path, remote: &str) -> DraftResult<RepoId> {
    let url = git::remote_url(runner, cwd, remote)?
        .ok_or_else(|| DraftError::UnknownRepo(remote.to_string()))?;
    git::parse_owner_repo(&url).ok_or(DraftError::UnknownRepo(url))
}

/// The branch checked out at `cwd`.
pub fn branch_from_head(runner: &dyn CommandRunner, cwd: &Utf8Path) -> DraftResult<String> {
    git::current_branch(runner, cwd)?.ok_or(DraftError::DetachedHead)
}

/// Every regular, non-hidden file in `dist_dir`, sorted.
pub fn default_assets(dist_dir: &Utf8Path) -> DraftResult<Vec<Utf8PathBuf>> {
    let names = staged_files(dist_dir).map_err(|source| DraftError::Io {
        path: dist_dir.to_path_buf(),
        source,
    })?;
    Ok(names.into_iter().map(|n| dist_dir.join(n)).collect())
}

/// Create a draft release and upload every asset to it.
///
/// # Errors
///
/// Returns [`DraftError`] when an asset cannot be read or an API call fails.
/// A release created before an upload failure is left in place as a draft.
#[instrument(skip(store, options, on_event), fields(repo = %options.repo, tag = %options.tag))]
pub fn draft_release(
    store: &dyn ReleaseStore,
    options: &DraftOptions,
    mut on_event: impl FnMut(ReleaseEvent),
) -> DraftResult<DraftOutcome> {
    let prerelease = options
        .prerelease
        .unwrap_or_else(|| is_prerelease(&options.tag));
    let new = NewRelease {
        tag_name: options.tag.clone(),
        target_commitish: options.branch.clone(),
        name: options
            .title
            .clone()
            .unwrap_or_else(|| format!("Release {}", options.tag)),
        body: options.body.clone(),
        draft: true,
        prerelease,
    };

    // Read everything before touching the API so a missing file fails fast.
    let mut payloads = Vec::with_capacity(options.assets.len());
    for path in &options.assets {
        let data = fs::read(path).map_err(|source| DraftError::Io {
            path: path.clone(),
            source,
        })?;
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        payloads.push((name, data));
    }

    let release = store.create_release(&options.repo, &new)?;
    info!(id = release.id, prerelease, "draft release created");

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Upload));
    let mut uploaded = Vec::with_capacity(payloads.len());
    for (name, data) in payloads {
        on_event(ReleaseEvent::Item {
            step: ReleaseStep::Upload,
            name: name.clone(),
        });
        let asset = store.upload_asset(&release, &name, &data)?;
        debug!(asset = %asset.name, id = asset.id, "uploaded asset");
        uploaded.push(name);
    }
    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Upload,
        StepOutcome::success(format!("{} assets", uploaded.len())),
    ));

    Ok(DraftOutcome {
        release_url: release.html_url,
        id: release.id,
        tag: release.tag_name,
        prerelease,
        assets: uploaded,
    })
}

//! Download release assets into a staging directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::checksum::sha256_file;
use crate::command::CommandRunner;
use crate::dist::{Checkers, DistCheckError, DistKind, check_dist};
use crate::github::{GitHubError, Release, ReleaseStore};

/// Errors from fetching release assets.
#[derive(Error, Debug)]
pub enum FetchError {
    /// A filesystem operation in the staging directory failed.
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An asset name would escape the staging directory.
    #[error("refusing to stage asset with unsafe name: {0}")]
    UnsafeName(String),

    /// Downloading an asset failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// A downloaded asset failed its distribution check.
    #[error(transparent)]
    DistCheck(#[from] DistCheckError),
}

/// Result alias for asset fetching.
pub type FetchResult<T> = Result<T, FetchError>;

/// A downloaded release asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalAsset {
    /// Asset file name, identical to the name on the release.
    pub name: String,
    /// Location inside the staging directory.
    pub path: Utf8PathBuf,
    /// SHA-256 of the downloaded content.
    pub checksum: String,
    /// Distribution kind, from the file suffix.
    pub kind: DistKind,
}

/// Remove `dir` and everything under it, then recreate it empty.
pub fn reset_staging(dir: &Utf8Path) -> FetchResult<()> {
    if dir.exists() {
        debug!(%dir, "clearing staging directory");
        fs::remove_dir_all(dir).map_err(|source| FetchError::Io {
            action: "failed to clear",
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::create_dir_all(dir).map_err(|source| FetchError::Io {
        action: "failed to create",
        path: dir.to_path_buf(),
        source,
    })
}

/// Download every asset of `release` into a fresh `staging` directory.
///
/// Assets are processed in the order the API lists them; each is checked as
/// soon as it lands, and the first failure aborts the run.
///
/// # Errors
///
/// Returns [`FetchError`] on filesystem, download, or check failures.
#[instrument(skip(store, runner, checkers, release), fields(release = release.id))]
pub fn fetch_assets(
    store: &dyn ReleaseStore,
    runner: &dyn CommandRunner,
    checkers: &Checkers,
    release: &Release,
    staging: &Utf8Path,
) -> FetchResult<Vec<LocalAsset>> {
    reset_staging(staging)?;

    let mut fetched = Vec::with_capacity(release.assets.len());
    for asset in &release.assets {
        if !is_safe_name(&asset.name) {
            return Err(FetchError::UnsafeName(asset.name.clone()));
        }

        info!(asset = %asset.name, "fetching asset");
        let path = staging.join(&asset.name);
        let file = File::create(&path).map_err(|source| FetchError::Io {
            action: "failed to create",
            path: path.clone(),
            source,
        })?;
        let mut sink = BufWriter::new(file);
        store.download_asset(asset, &mut sink)?;
        sink.flush().map_err(|source| FetchError::Io {
            action: "failed to write",
            path: path.clone(),
            source,
        })?;
        drop(sink);

        let kind = check_dist(runner, checkers, &path)?;
        let checksum = sha256_file(&path).map_err(|source| FetchError::Io {
            action: "failed to hash",
            path: path.clone(),
            source,
        })?;

        fetched.push(LocalAsset {
            name: asset.name.clone(),
            path,
            checksum,
            kind,
        });
    }

    info!(count = fetched.len(), "assets fetched");
    Ok(fetched)
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

//! GitHub release hosting.
//!
//! The rest of the crate talks to GitHub only through [`ReleaseStore`], a
//! narrow capability covering the handful of REST calls the release tail
//! needs. [`GitHubClient`] implements it over a blocking `ureq` agent.

mod client;
pub mod types;

use std::io::Write;

use thiserror::Error;

use crate::reference::RepoId;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use types::{Asset, GitObject, NewRelease, Release, ReleaseUpdate, Repository, TagRef};

/// Errors from the GitHub API.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// The API answered with a non-success status.
    #[error("GitHub API returned {status} for {url}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Response body, as much as could be read.
        body: String,
    },

    /// The request never got an HTTP response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Request URL.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// The response body was not the JSON we expected.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Request URL.
        url: String,
        /// Underlying decode error.
        source: std::io::Error,
    },

    /// The release carries no usable upload URL.
    #[error("release {0} has no upload url")]
    MissingUploadUrl(u64),

    /// Reading a response body or writing it out failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for GitHub API calls.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Capability to read and mutate releases on the hosting service.
///
/// Lookups return `Ok(None)` when the resource does not exist so callers can
/// turn absence into their own domain error.
pub trait ReleaseStore {
    /// Fetch a release by tag name.
    fn release_by_tag(&self, repo: &RepoId, tag: &str) -> GitHubResult<Option<Release>>;

    /// Fetch a release by numeric id.
    fn release_by_id(&self, repo: &RepoId, id: u64) -> GitHubResult<Option<Release>>;

    /// List every reference under `refs/tags/`.
    fn list_tags(&self, repo: &RepoId) -> GitHubResult<Vec<TagRef>>;

    /// Fetch repository metadata.
    fn repository(&self, repo: &RepoId) -> GitHubResult<Repository>;

    /// Replace a release's editable fields.
    fn update_release(
        &self,
        repo: &RepoId,
        id: u64,
        update: &ReleaseUpdate,
    ) -> GitHubResult<Release>;

    /// Delete a release. Its tag is left in place.
    fn delete_release(&self, repo: &RepoId, id: u64) -> GitHubResult<()>;

    /// Delete one release asset.
    fn delete_asset(&self, repo: &RepoId, asset_id: u64) -> GitHubResult<()>;

    /// Stream an asset's bytes into `sink`, returning the byte count.
    fn download_asset(&self, asset: &Asset, sink: &mut dyn Write) -> GitHubResult<u64>;

    /// Create a new release.
    fn create_release(&self, repo: &RepoId, release: &NewRelease) -> GitHubResult<Release>;

    /// Attach a file to a release under `name`.
    fn upload_asset(&self, release: &Release, name: &str, data: &[u8]) -> GitHubResult<Asset>;
}

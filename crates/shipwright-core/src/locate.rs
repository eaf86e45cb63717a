//! Resolve a release reference to the release record it names.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::{GitHubError, Release, ReleaseStore};
use crate::reference::ReleaseRef;

/// Errors from locating a release.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No release exists for the reference.
    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    /// The hosting API call failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Result alias for release lookup.
pub type LocateResult<T> = Result<T, LocateError>;

/// Fetch the release `reference` points at.
///
/// # Errors
///
/// [`LocateError::ReleaseNotFound`] when the API has no such release, or
/// [`LocateError::GitHub`] for any other API failure.
#[instrument(skip(store), fields(reference = %reference))]
pub fn locate_release(store: &dyn ReleaseStore, reference: &ReleaseRef) -> LocateResult<Release> {
    let found = match reference {
        ReleaseRef::Html { repo, tag } => store.release_by_tag(repo, tag)?,
        ReleaseRef::Api { repo, id } => store.release_by_id(repo, *id)?,
    };

    let release = found.ok_or_else(|| LocateError::ReleaseNotFound(reference.to_string()))?;
    debug!(
        id = release.id,
        tag = %release.tag_name,
        draft = release.draft,
        assets = release.assets.len(),
        "located release"
    );
    Ok(release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStore, asset, release};

    #[test]
    fn html_reference_looks_up_by_tag() {
        let store = FakeStore::with_release(release(5, "v1.0.0", vec![asset(1, "a.whl")]));
        let reference = ReleaseRef::parse("https://github.com/foo/bar/releases/tag/v1.0.0").unwrap();

        let found = locate_release(&store, &reference).unwrap();
        assert_eq!(found.id, 5);
        assert_eq!(store.calls(), vec!["GET release tag v1.0.0"]);
    }

    #[test]
    fn api_reference_looks_up_by_id() {
        let store = FakeStore::with_release(release(5, "v1.0.0", Vec::new()));
        let reference = ReleaseRef::parse("https://api.github.com/repos/foo/bar/releases/5").unwrap();

        let found = locate_release(&store, &reference).unwrap();
        assert_eq!(found.tag_name, "v1.0.0");
        assert_eq!(store.calls(), vec!["GET release 5"]);
    }

    #[test]
    fn missing_release_is_not_found() {
        let store = FakeStore::default();
        let reference = ReleaseRef::parse("https://github.com/foo/bar/releases/tag/v9").unwrap();

        let err = locate_release(&store, &reference).unwrap_err();
        assert!(matches!(err, LocateError::ReleaseNotFound(ref r) if r.ends_with("/v9")));
    }

    #[test]
    fn api_failure_propagates() {
        let store = FakeStore::with_release(release(5, "v1.0.0", Vec::new())).failing("GET");
        let reference = ReleaseRef::parse("https://api.github.com/repos/foo/bar/releases/5").unwrap();

        assert!(matches!(
            locate_release(&store, &reference),
            Err(LocateError::GitHub(_))
        ));
    }
}

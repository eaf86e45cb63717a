//! Commit-message checksum verification.
//!
//! The commit a release tag points at must record the SHA-256 of every asset
//! attached to the release. A record is any message line that mentions both
//! the asset's file name and its checksum, e.g.
//!
//! ```text
//! sha256:3f9a...e1 dist/foo-1.0.0-py3-none-any.whl
//! ```
//!
//! This is a textual cross-check, not a signature: it trusts whoever could
//! push the release commit.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::checksum::sha256_file;
use crate::command::CommandRunner;
use crate::fetch::LocalAsset;
use crate::git::{self, GitError};
use crate::github::{GitHubError, Release, ReleaseStore};
use crate::reference::RepoId;

/// Errors from release verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// No tag reference matches the release's tag.
    #[error("could not find tag {0}")]
    TagNotFound(String),

    /// An asset's checksum is not recorded in the release commit.
    #[error("invalid file {asset}: {detail}")]
    AssetIntegrity {
        /// Asset file name.
        asset: String,
        /// What was wrong.
        detail: String,
    },

    /// Reading the release commit failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A hosting API call failed.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// Local file access failed.
    #[error("{path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result alias for verification.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Result of scanning a commit message for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// A line carries both the name and the checksum.
    Valid,
    /// The name appears, but never next to the checksum.
    Mismatched,
    /// The name never appears.
    Absent,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    matched: bool,
    saw_name_without_match: bool,
}

/// Scan `message` for a line recording `name` with `checksum`.
///
/// Any matching line validates the asset, even when other lines name it with
/// a different checksum; those lines are logged as mismatches.
pub fn scan_commit_message(message: &str, name: &str, checksum: &str) -> ScanOutcome {
    let state = message
        .lines()
        .filter(|line| line.contains(name))
        .fold(ScanState::default(), |mut state, line| {
            if line.contains(checksum) {
                state.matched = true;
            } else {
                warn!(asset = %name, line = %line.trim(), "mismatched sha");
                state.saw_name_without_match = true;
            }
            state
        });

    match state {
        ScanState { matched: true, .. } => ScanOutcome::Valid,
        ScanState {
            saw_name_without_match: true,
            ..
        } => ScanOutcome::Mismatched,
        ScanState { .. } => ScanOutcome::Absent,
    }
}

/// Resolve a tag name to the hash its reference points at.
///
/// # Errors
///
/// [`VerifyError::TagNotFound`] when no `refs/tags/<tag>` exists.
#[instrument(skip(store), fields(%repo))]
pub fn resolve_tag_commit(store: &dyn ReleaseStore, repo: &RepoId, tag: &str) -> VerifyResult<String> {
    let wanted = format!("refs/tags/{tag}");
    let sha = store
        .list_tags(repo)?
        .into_iter()
        .find(|t| t.ref_name == wanted)
        .map(|t| t.object.sha)
        .ok_or_else(|| VerifyError::TagNotFound(tag.to_string()))?;
    debug!(%tag, %sha, "resolved tag");
    Ok(sha)
}

/// Read the full message of commit `sha` from a throwaway clone.
///
/// The release's target branch is fetched first unless the repository URL
/// is a path on this machine, where the clone already has every ref.
#[instrument(skip(store, runner, release), fields(%repo, tag = %release.tag_name))]
pub fn read_commit_message(
    store: &dyn ReleaseStore,
    runner: &dyn CommandRunner,
    repo: &RepoId,
    release: &Release,
    sha: &str,
) -> VerifyResult<String> {
    let url = store.repository(repo)?.html_url;

    let tmp = tempfile::Builder::new()
        .prefix("shipwright-")
        .tempdir()
        .map_err(|source| VerifyError::Io {
            path: std::env::temp_dir().display().to_string(),
            source,
        })?;
    let parent = Utf8PathBuf::try_from(tmp.path().to_path_buf()).map_err(|e| VerifyError::Io {
        path: e.as_path().display().to_string(),
        source: e.into_io_error(),
    })?;

    let checkout = git::clone(runner, &url, &parent)?;
    if !Utf8Path::new(&url).exists() && !release.target_commitish.is_empty() {
        git::fetch_branch(runner, &checkout, &release.target_commitish)?;
    }
    Ok(git::commit_message(runner, &checkout, sha)?)
}

/// Check every asset against the commit message.
///
/// Checksums are recomputed from the staged files, so anything that changed
/// on disk after download is caught too.
///
/// # Errors
///
/// [`VerifyError::AssetIntegrity`] for the first asset whose checksum is not
/// recorded.
pub fn verify_assets(message: &str, assets: &[LocalAsset]) -> VerifyResult<()> {
    for asset in assets {
        let checksum = sha256_file(&asset.path).map_err(|source| VerifyError::Io {
            path: asset.path.to_string(),
            source,
        })?;

        match scan_commit_message(message, &asset.name, &checksum) {
            ScanOutcome::Valid => debug!(asset = %asset.name, "checksum verified"),
            ScanOutcome::Mismatched => {
                return Err(VerifyError::AssetIntegrity {
                    asset: asset.name.clone(),
                    detail: format!("sha256 {checksum} does not match the release commit"),
                });
            }
            ScanOutcome::Absent => {
                return Err(VerifyError::AssetIntegrity {
                    asset: asset.name.clone(),
                    detail: "not listed in the release commit".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Verify downloaded assets against the commit the release's tag points at.
///
/// # Errors
///
/// Returns [`VerifyError`] when the tag is missing, the commit cannot be
/// read, or any asset fails its checksum.
#[instrument(skip_all, fields(%repo, tag = %release.tag_name))]
pub fn verify_release(
    store: &dyn ReleaseStore,
    runner: &dyn CommandRunner,
    repo: &RepoId,
    release: &Release,
    assets: &[LocalAsset],
) -> VerifyResult<()> {
    let sha = resolve_tag_commit(store, repo, &release.tag_name)?;
    let message = read_commit_message(store, runner, repo, release, &sha)?;
    verify_assets(&message, assets)?;
    info!(count = assets.len(), "all asset checksums verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::sha256_bytes;
    use crate::command::ShellRunner;
    use crate::dist::DistKind;
    use crate::testing::{FakeRunner, FakeStore, release};
    use tempfile::TempDir;

    fn stage(tmp: &TempDir, name: &str, bytes: &[u8]) -> LocalAsset {
        let path = Utf8PathBuf::try_from(tmp.path().join(name)).unwrap();
        std::fs::write(&path, bytes).unwrap();
        LocalAsset {
            name: name.to_string(),
            checksum: sha256_bytes(bytes),
            kind: DistKind::from_name(name),
            path,
        }
    }

    #[test]
    fn line_with_name_and_checksum_is_valid() {
        let msg = "Publish 1.0.0\n\nsha256:abc123 dist/foo-1.0.0.whl\n";
        assert_eq!(scan_commit_message(msg, "foo-1.0.0.whl", "abc123"), ScanOutcome::Valid);
    }

    #[test]
    fn line_with_name_only_is_mismatched() {
        let msg = "sha256:abc123 dist/foo-1.0.0.whl";
        assert_eq!(
            scan_commit_message(msg, "foo-1.0.0.whl", "def456"),
            ScanOutcome::Mismatched
        );
    }

    #[test]
    fn missing_name_is_absent() {
        let msg = "sha256:abc123 dist/bar-1.0.0.whl";
        assert_eq!(scan_commit_message(msg, "foo-1.0.0.whl", "abc123"), ScanOutcome::Absent);
        assert_eq!(scan_commit_message("", "foo-1.0.0.whl", "abc123"), ScanOutcome::Absent);
    }

    #[test]
    fn any_matching_line_wins_over_mismatches() {
        let msg = "sha256:000000 dist/foo.tgz\nsha256:abc123 dist/foo.tgz\n";
        assert_eq!(scan_commit_message(msg, "foo.tgz", "abc123"), ScanOutcome::Valid);

        let reversed = "sha256:abc123 dist/foo.tgz\nsha256:000000 dist/foo.tgz\n";
        assert_eq!(scan_commit_message(reversed, "foo.tgz", "abc123"), ScanOutcome::Valid);
    }

    #[test]
    fn verify_assets_reports_integrity_failure() {
        let tmp = TempDir::new().unwrap();
        let asset = stage(&tmp, "foo-1.0.0.whl", b"wheel bytes");
        let good = format!("sha256:{} dist/foo-1.0.0.whl", asset.checksum);

        verify_assets(&good, std::slice::from_ref(&asset)).unwrap();

        let err = verify_assets("sha256:def456 dist/foo-1.0.0.whl", &[asset]).unwrap_err();
        assert!(matches!(err, VerifyError::AssetIntegrity { ref asset, .. } if asset == "foo-1.0.0.whl"));
    }

    #[test]
    fn verify_assets_recomputes_from_disk() {
        let tmp = TempDir::new().unwrap();
        let asset = stage(&tmp, "foo.tgz", b"original");
        let msg = format!("sha256:{} foo.tgz", asset.checksum);
        std::fs::write(&asset.path, b"tampered").unwrap();

        assert!(matches!(
            verify_assets(&msg, &[asset]),
            Err(VerifyError::AssetIntegrity { .. })
        ));
    }

    #[test]
    fn missing_tag_is_tag_not_found() {
        let store = FakeStore::default().tag("v0.9.0", "aaa");
        let err = resolve_tag_commit(&store, &RepoId::new("foo", "bar"), "v1.0.0").unwrap_err();
        assert!(matches!(err, VerifyError::TagNotFound(ref t) if t == "v1.0.0"));
    }

    #[test]
    fn remote_repository_is_cloned_then_fetched() {
        let tmp = TempDir::new().unwrap();
        let asset = stage(&tmp, "foo.tgz", b"npm");
        let message = format!("Publish foo\n\nsha256:{} dist/foo.tgz\n", asset.checksum);

        let mut store = FakeStore::with_release(release(1, "v1.0.0", Vec::new())).tag("v1.0.0", "c0ffee");
        store.clone_url = "https://github.com/foo/bar".to_string();
        let runner = FakeRunner::default().respond("git log", &message);
        let rel = store.releases.borrow()[0].clone();

        verify_release(&store, &runner, &RepoId::new("foo", "bar"), &rel, &[asset]).unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], "git clone https://github.com/foo/bar local");
        assert_eq!(commands[1], "git fetch origin main");
        assert_eq!(commands[2], "git log '--format=%B' -n 1 c0ffee");
        assert!(runner.calls.borrow()[1].1.ends_with("local"));
    }

    #[test]
    fn verifies_against_a_real_local_repository() {
        if which::which("git").is_err() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let staged = TempDir::new().unwrap();
        let asset = stage(&staged, "foo-1.0.0.tgz", b"tarball");
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let message = format!("Publish 1.0.0\n\nsha256:{} dist/foo-1.0.0.tgz", asset.checksum);
        std::fs::write(tmp.path().join("msg.txt"), &message).unwrap();
        ShellRunner
            .run(
                "git init -q && git -c user.name=ci -c user.email=ci@example.com \
                 commit -q --allow-empty -F msg.txt && git rev-parse HEAD",
                &root,
            )
            .unwrap();
        let sha = ShellRunner.run("git rev-parse HEAD", &root).unwrap().stdout;

        let mut store = FakeStore::with_release(release(1, "v1.0.0", Vec::new()))
            .tag("v1.0.0", sha.trim());
        store.clone_url = root.to_string();
        let rel = store.releases.borrow()[0].clone();

        verify_release(&store, &ShellRunner, &RepoId::new("foo", "bar"), &rel, &[asset]).unwrap();
    }
}

//! Git operations for release workflows.
//!
//! Shells out to `git` through a [`CommandRunner`]. This inherits the user's
//! credentials helpers, SSH keys, and other configuration.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::command::{CommandError, CommandRunner, shell_quote};
use crate::reference::RepoId;

/// Directory name used for fresh clones.
const CHECKOUT_DIR: &str = "local";

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// `git` could not be run or returned a non-zero exit code.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Clone `url` into `<parent>/local` and return the checkout path.
#[instrument(skip(runner))]
pub fn clone(runner: &dyn CommandRunner, url: &str, parent: &Utf8Path) -> GitResult<Utf8PathBuf> {
    git(runner, parent, &["clone", url, CHECKOUT_DIR])?;
    let checkout = parent.join(CHECKOUT_DIR);
    debug!(%checkout, "cloned repository");
    Ok(checkout)
}

/// Fetch `branch` from `origin` into an existing checkout.
#[instrument(skip(runner))]
pub fn fetch_branch(runner: &dyn CommandRunner, checkout: &Utf8Path, branch: &str) -> GitResult<()> {
    git(runner, checkout, &["fetch", "origin", branch])?;
    Ok(())
}

/// Full message of the commit `sha`.
#[instrument(skip(runner))]
pub fn commit_message(runner: &dyn CommandRunner, checkout: &Utf8Path, sha: &str) -> GitResult<String> {
    let message = git(runner, checkout, &["log", "--format=%B", "-n", "1", sha])?;
    debug!(lines = message.lines().count(), "read commit message");
    Ok(message)
}

/// Get the current branch name.
///
/// Returns `None` if in a detached HEAD state.
#[instrument(skip(runner))]
pub fn current_branch(runner: &dyn CommandRunner, cwd: &Utf8Path) -> GitResult<Option<String>> {
    let output = git(runner, cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" {
        debug!("detached HEAD");
        Ok(None)
    } else {
        debug!(%branch, "current branch");
        Ok(Some(branch))
    }
}

/// Get the URL of a named remote, or `None` if it is not configured.
#[instrument(skip(runner))]
pub fn remote_url(runner: &dyn CommandRunner, cwd: &Utf8Path, remote: &str) -> GitResult<Option<String>> {
    match git(runner, cwd, &["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command(CommandError::Failed { .. })) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if `cwd` is inside a git work tree.
#[instrument(skip(runner))]
pub fn is_inside_repo(runner: &dyn CommandRunner, cwd: &Utf8Path) -> GitResult<bool> {
    match git(runner, cwd, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::NotARepo | GitError::Command(CommandError::Failed { .. })) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Parse the repository from a git remote URL.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
///
/// Returns `None` if the URL cannot be parsed.
pub fn parse_owner_repo(url: &str) -> Option<RepoId> {
    let url = url.trim();
    let path = url.strip_prefix("git@").map_or_else(
        || {
            url.split("//")
                .nth(1)
                .and_then(|after_scheme| after_scheme.split_once('/').map(|(_, path)| path))
        },
        |rest| rest.split_once(':').map(|(_, path)| path),
    )?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    RepoId::from_slug(path.trim_end_matches('/'))
}

/// Run a git command in `cwd` and return its stdout.
fn git(runner: &dyn CommandRunner, cwd: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let command = std::iter::once("git".to_string())
        .chain(args.iter().map(|a| shell_quote(a)))
        .collect::<Vec<_>>()
        .join(" ");

    match runner.run(&command, cwd) {
        Ok(output) => Ok(output.stdout),
        Err(CommandError::Failed { stderr, .. }) if stderr.contains("not a git repository") => {
            Err(GitError::NotARepo)
        }
        Err(e) => Err(e.into()),
    }
}

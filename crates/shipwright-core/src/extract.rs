//! Extract a draft release: download, check, and verify its assets.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::command::CommandRunner;
use crate::dist::Checkers;
use crate::event::{ReleaseEvent, ReleaseStep, StepOutcome};
use crate::fetch::{self, FetchError, LocalAsset};
use crate::github::ReleaseStore;
use crate::locate::{LocateError, locate_release};
use crate::reference::{ReferenceError, ReleaseRef};
use crate::verify::{self, VerifyError};

/// Errors from extracting a release.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The release reference is malformed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The release could not be located.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Downloading or checking an asset failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Checksum verification failed.
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Result alias for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Options for [`extract_release`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Staging directory; wiped at the start of the run.
    pub staging: Utf8PathBuf,
    /// Skip checksum verification (the remote tag may not exist yet).
    pub dry_run: bool,
    /// Optional external distribution checkers.
    pub checkers: Checkers,
}

/// What an extraction produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    /// Web URL of the release.
    pub release_url: String,
    /// Release tag.
    pub tag: String,
    /// Staging directory holding the assets.
    pub staging: Utf8PathBuf,
    /// Downloaded assets in API order.
    pub assets: Vec<LocalAsset>,
    /// Whether checksums were verified (false for dry runs).
    pub verified: bool,
}

/// Download every asset of a release, check it, and verify its checksum
/// against the commit the release tag points at.
///
/// The reference is parsed before any network call.
///
/// # Errors
///
/// Returns [`ExtractError`] for a malformed reference, a missing release, a
/// failed download or check, or a failed verification.
#[instrument(skip(store, runner, options, on_event), fields(dry_run = options.dry_run))]
pub fn extract_release(
    store: &dyn ReleaseStore,
    runner: &dyn CommandRunner,
    reference: &str,
    options: &ExtractOptions,
    mut on_event: impl FnMut(ReleaseEvent),
) -> ExtractResult<ExtractOutcome> {
    let reference = ReleaseRef::parse(reference)?;

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Locate));
    let release = locate_release(store, &reference)?;
    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Locate,
        StepOutcome::success(format!("{} ({} assets)", release.tag_name, release.assets.len())),
    ));

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Fetch));
    let assets = fetch::fetch_assets(store, runner, &options.checkers, &release, &options.staging)?;
    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Fetch,
        StepOutcome::success(format!("{} assets into {}", assets.len(), options.staging)),
    ));

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Verify));
    if options.dry_run {
        info!("dry run, skipping checksum verification");
        on_event(ReleaseEvent::StepCompleted(
            ReleaseStep::Verify,
            StepOutcome::skipped("dry run"),
        ));
    } else {
        verify::verify_release(store, runner, reference.repo(), &release, &assets)?;
        on_event(ReleaseEvent::StepCompleted(
            ReleaseStep::Verify,
            StepOutcome::success("checksums match the release commit"),
        ));
    }

    Ok(ExtractOutcome {
        release_url: release.html_url,
        tag: release.tag_name,
        staging: options.staging.clone(),
        assets,
        verified: !options.dry_run,
    })
}

/// Convenience for callers holding a borrowed staging path.
pub fn options_for(staging: &Utf8Path, dry_run: bool, checkers: Checkers) -> ExtractOptions {
    ExtractOptions {
        staging: staging.to_path_buf(),
        dry_run,
        checkers,
    }
}

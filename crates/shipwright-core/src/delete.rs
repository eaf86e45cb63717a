//! Delete a draft release and its assets.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::event::{ReleaseEvent, ReleaseStep, StepOutcome};
use crate::github::{GitHubError, ReleaseStore};
use crate::locate::{LocateError, locate_release};
use crate::reference::{ReferenceError, ReleaseRef};

/// Errors from deleting a release.
#[derive(Error, Debug)]
pub enum DeleteError {
    /// The release reference is malformed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// The release could not be located.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// A delete call failed. Assets deleted before the failure stay deleted.
    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Result alias for deletion.
pub type DeleteResult<T> = Result<T, DeleteError>;

/// What a delete run removed.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    /// Web URL the release had.
    pub release_url: String,
    /// Release tag; the tag itself is not deleted.
    pub tag: String,
    /// Names of the deleted assets.
    pub assets: Vec<String>,
}

/// Delete every asset of a release, then the release itself.
///
/// There is no confirmation and no undo.
///
/// # Errors
///
/// Returns [`DeleteError`] for a malformed reference, a missing release, or
/// the first failing delete call.
#[instrument(skip(store, on_event))]
pub fn delete_release(
    store: &dyn ReleaseStore,
    reference: &str,
    mut on_event: impl FnMut(ReleaseEvent),
) -> DeleteResult<DeleteOutcome> {
    let reference = ReleaseRef::parse(reference)?;
    let repo = reference.repo();
    let release = locate_release(store, &reference)?;

    on_event(ReleaseEvent::StepStarted(ReleaseStep::Delete));
    let mut deleted = Vec::with_capacity(release.assets.len());
    for asset in &release.assets {
        on_event(ReleaseEvent::Item {
            step: ReleaseStep::Delete,
            name: asset.name.clone(),
        });
        store.delete_asset(repo, asset.id)?;
        deleted.push(asset.name.clone());
    }
    store.delete_release(repo, release.id)?;
    info!(id = release.id, assets = deleted.len(), "release deleted");
    on_event(ReleaseEvent::StepCompleted(
        ReleaseStep::Delete,
        StepOutcome::success(format!("{} and {} assets", release.tag_name, deleted.len())),
    ));

    Ok(DeleteOutcome {
        release_url: release.html_url,
        tag: release.tag_name,
        assets: deleted,
    })
}

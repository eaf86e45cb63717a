//! Progress events emitted by the release operations.
//!
//! Operations take an `on_event` callback so the CLI can render progress
//! without the core knowing anything about terminals.

use serde::Serialize;

/// Steps of the release operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStep {
    /// Resolve the release reference.
    Locate,
    /// Download and check assets.
    Fetch,
    /// Cross-check checksums against the release commit.
    Verify,
    /// Upload files to registries or to the release.
    Upload,
    /// Update the release record.
    Finalize,
    /// Delete assets and the release.
    Delete,
}

impl std::fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locate => write!(f, "locate"),
            Self::Fetch => write!(f, "fetch"),
            Self::Verify => write!(f, "verify"),
            Self::Upload => write!(f, "upload"),
            Self::Finalize => write!(f, "finalize"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step ran.
    Success {
        /// Short summary.
        message: String,
    },
    /// The step was skipped.
    Skipped {
        /// Why.
        reason: String,
    },
}

impl StepOutcome {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Events for progress reporting.
#[derive(Debug, Clone)]
pub enum ReleaseEvent {
    /// A step has started.
    StepStarted(ReleaseStep),
    /// A step is working on one file.
    Item {
        /// Current step.
        step: ReleaseStep,
        /// File or asset name.
        name: String,
    },
    /// A step has finished.
    StepCompleted(ReleaseStep, StepOutcome),
}

//! Release references.
//!
//! A release is addressed by one of two URL shapes:
//!
//! - the page a human sees: `https://github.com/{owner}/{repo}/releases/tag/{tag}`
//! - the REST resource: `https://api.github.com/repos/{owner}/{repo}/releases/{id}`
//!
//! [`ReleaseRef::parse`] is the only way to build a reference, so anything
//! holding a [`ReleaseRef`] has already been validated.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static HTML_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+)/releases/tag/(?P<tag>[^/]+)$")
        .expect("valid release url pattern")
});

static API_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://api\.github\.com/repos/(?P<owner>[^/]+)/(?P<repo>[^/]+)/releases/(?P<id>[0-9]+)$",
    )
    .expect("valid release url pattern")
});

/// Errors from parsing a release reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The string matches neither recognized release URL shape.
    #[error("release url is not valid: {0}")]
    Invalid(String),
}

/// An `owner/repo` pair on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoId {
    /// Account or organization that owns the repository.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl RepoId {
    /// Build a repository id from its parts.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse an `owner/repo` slug.
    pub fn from_slug(slug: &str) -> Option<Self> {
        let (owner, repo) = slug.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A validated reference to a single release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRef {
    /// Release page URL, addressed by tag.
    Html {
        /// Owning repository.
        repo: RepoId,
        /// Tag name, e.g. `v1.2.3`.
        tag: String,
    },
    /// REST API URL, addressed by numeric release id.
    Api {
        /// Owning repository.
        repo: RepoId,
        /// Release id.
        id: u64,
    },
}

impl ReleaseRef {
    /// Parse a release URL into a reference.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Invalid`] when `raw` matches neither shape.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let raw = raw.trim();

        if let Some(caps) = HTML_PATTERN.captures(raw) {
            return Ok(Self::Html {
                repo: RepoId::new(&caps["owner"], &caps["repo"]),
                tag: caps["tag"].to_string(),
            });
        }

        if let Some(caps) = API_PATTERN.captures(raw)
            && let Ok(id) = caps["id"].parse::<u64>()
        {
            return Ok(Self::Api {
                repo: RepoId::new(&caps["owner"], &caps["repo"]),
                id,
            });
        }

        Err(ReferenceError::Invalid(raw.to_string()))
    }

    /// The repository the release belongs to.
    pub const fn repo(&self) -> &RepoId {
        match self {
            Self::Html { repo, .. } | Self::Api { repo, .. } => repo,
        }
    }
}

impl FromStr for ReleaseRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html { repo, tag } => {
                write!(f, "https://github.com/{repo}/releases/tag/{tag}")
            }
            Self::Api { repo, id } => {
                write!(f, "https://api.github.com/repos/{repo}/releases/{id}")
            }
        }
    }
}

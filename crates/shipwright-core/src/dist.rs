//! Distribution file classification and structural checks.
//!
//! Release assets are classified by their final suffix, the same way the
//! publisher picks an upload command:
//!
//! | Suffix | Kind | Check |
//! |--------|------|-------|
//! | `.whl` | [`DistKind::Wheel`] | zip with `*.dist-info/WHEEL` and `*.dist-info/METADATA` |
//! | `.gz`  | [`DistKind::Sdist`] | gzip tar with `<dir>/PKG-INFO` |
//! | `.tgz` | [`DistKind::Npm`] | gzip tar with `package/package.json` naming the package |
//!
//! Anything else is [`DistKind::Other`] and is neither checked nor published.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Component;

use camino::Utf8Path;
use flate2::read::GzDecoder;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::command::{CommandError, CommandRunner, render_template};

/// What kind of distribution a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistKind {
    /// Python wheel.
    Wheel,
    /// Python source distribution.
    Sdist,
    /// npm package tarball.
    Npm,
    /// Not a recognized distribution.
    Other,
}

impl DistKind {
    /// Classify a file by name.
    pub fn from_name(name: &str) -> Self {
        match Utf8Path::new(name).extension() {
            Some("whl") => Self::Wheel,
            Some("gz") => Self::Sdist,
            Some("tgz") => Self::Npm,
            _ => Self::Other,
        }
    }

    /// Whether this is a Python distribution.
    pub const fn is_python(self) -> bool {
        matches!(self, Self::Wheel | Self::Sdist)
    }
}

impl fmt::Display for DistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wheel => "wheel",
            Self::Sdist => "sdist",
            Self::Npm => "npm tarball",
            Self::Other => "file",
        };
        f.write_str(s)
    }
}

/// A distribution file failed validation.
#[derive(Error, Debug)]
pub enum DistCheckError {
    /// The archive could not be opened or read.
    #[error("{path}: not a readable {kind}: {source}")]
    Unreadable {
        /// Offending file.
        path: String,
        /// Expected kind.
        kind: DistKind,
        /// Underlying read error.
        source: std::io::Error,
    },

    /// The archive was readable but lacks required content.
    #[error("{path}: invalid {kind}: {reason}")]
    Invalid {
        /// Offending file.
        path: String,
        /// Expected kind.
        kind: DistKind,
        /// What is missing or malformed.
        reason: String,
    },

    /// A configured checker command rejected the file.
    #[error("{path}: checker rejected {kind}: {source}")]
    Checker {
        /// Offending file.
        path: String,
        /// Expected kind.
        kind: DistKind,
        /// Command failure.
        source: CommandError,
    },
}

/// Result alias for distribution checks.
pub type DistCheckResult<T> = Result<T, DistCheckError>;

/// Optional external checker commands, run after the built-in checks.
#[derive(Debug, Clone, Default)]
pub struct Checkers {
    /// Checker for wheels and sdists, e.g. `twine check`.
    pub python: Option<String>,
    /// Checker for npm tarballs.
    pub npm: Option<String>,
}

impl Checkers {
    fn for_kind(&self, kind: DistKind) -> Option<&str> {
        match kind {
            DistKind::Wheel | DistKind::Sdist => self.python.as_deref(),
            DistKind::Npm => self.npm.as_deref(),
            DistKind::Other => None,
        }
    }
}

/// Validate a downloaded file according to its kind.
///
/// Files of kind [`DistKind::Other`] pass without inspection. When a checker
/// is configured for the kind it runs in the file's directory with the file
/// name as its argument.
///
/// # Errors
///
/// Returns [`DistCheckError`] when the file fails the structural check or
/// the checker command.
#[instrument(skip(runner, checkers))]
pub fn check_dist(
    runner: &dyn CommandRunner,
    checkers: &Checkers,
    path: &Utf8Path,
) -> DistCheckResult<DistKind> {
    let name = path.file_name().unwrap_or(path.as_str());
    let kind = DistKind::from_name(name);

    match kind {
        DistKind::Wheel => check_wheel(path)?,
        DistKind::Sdist => check_sdist(path)?,
        DistKind::Npm => check_npm(path)?,
        DistKind::Other => {
            info!(file = %name, "nothing to check");
            return Ok(kind);
        }
    }

    if let Some(template) = checkers.for_kind(kind) {
        let cwd = path.parent().unwrap_or(Utf8Path::new("."));
        runner
            .run(&render_template(template, name), cwd)
            .map_err(|source| DistCheckError::Checker {
                path: path.to_string(),
                kind,
                source,
            })?;
    }

    debug!(file = %name, %kind, "distribution check passed");
    Ok(kind)
}

fn unreadable(path: &Utf8Path, kind: DistKind) -> impl FnOnce(std::io::Error) -> DistCheckError {
    let path = path.to_string();
    move |source| DistCheckError::Unreadable { path, kind, source }
}

fn invalid(path: &Utf8Path, kind: DistKind, reason: impl Into<String>) -> DistCheckError {
    DistCheckError::Invalid {
        path: path.to_string(),
        kind,
        reason: reason.into(),
    }
}

fn check_wheel(path: &Utf8Path) -> DistCheckResult<()> {
    let kind = DistKind::Wheel;
    let file = File::open(path).map_err(unreadable(path, kind))?;
    let archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| unreadable(path, kind)(std::io::Error::other(e)))?;

    let has = |suffix: &str| {
        archive
            .file_names()
            .any(|n| n.ends_with(suffix) && n.contains(".dist-info/"))
    };
    if !has(".dist-info/WHEEL") {
        return Err(invalid(path, kind, "missing .dist-info/WHEEL"));
    }
    if !has(".dist-info/METADATA") {
        return Err(invalid(path, kind, "missing .dist-info/METADATA"));
    }
    Ok(())
}

fn open_tar(
    path: &Utf8Path,
    kind: DistKind,
) -> DistCheckResult<tar::Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(path).map_err(unreadable(path, kind))?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}

/// Normal path components of an archive entry, ignoring any leading `./`.
fn entry_parts(entry_path: &std::path::Path) -> Vec<String> {
    entry_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn check_sdist(path: &Utf8Path) -> DistCheckResult<()> {
    let kind = DistKind::Sdist;
    let mut archive = open_tar(path, kind)?;

    for entry in archive.entries().map_err(unreadable(path, kind))? {
        let entry = entry.map_err(unreadable(path, kind))?;
        let entry_path = entry.path().map_err(unreadable(path, kind))?;
        let parts = entry_parts(&entry_path);
        if parts.len() == 2 && parts[1] == "PKG-INFO" {
            return Ok(());
        }
    }
    Err(invalid(path, kind, "missing <dir>/PKG-INFO"))
}

fn check_npm(path: &Utf8Path) -> DistCheckResult<()> {
    let kind = DistKind::Npm;
    let mut archive = open_tar(path, kind)?;

    for entry in archive.entries().map_err(unreadable(path, kind))? {
        let mut entry = entry.map_err(unreadable(path, kind))?;
        let parts = entry_parts(&entry.path().map_err(unreadable(path, kind))?);
        if parts != ["package", "package.json"] {
            continue;
        }

        let mut raw = String::new();
        entry
            .read_to_string(&mut raw)
            .map_err(unreadable(path, kind))?;
        let manifest: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| invalid(path, kind, format!("package.json is not valid JSON: {e}")))?;

        for field in ["name", "version"] {
            if !manifest.get(field).is_some_and(serde_json::Value::is_string) {
                return Err(invalid(path, kind, format!("package.json has no {field}")));
            }
        }
        return Ok(());
    }
    Err(invalid(path, kind, "missing package/package.json"))
}

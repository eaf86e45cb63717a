//! Checksum lines for the release commit message.
//!
//! Each line has the form `sha256:<hex> <dist_dir>/<name>`, which is exactly
//! what [`verify`](crate::verify) looks for.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::checksum::sha256_file;
use crate::publish::staged_files;

/// One manifest line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Hex SHA-256 of the file.
    pub sha256: String,
    /// Path as written in the line.
    pub path: Utf8PathBuf,
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{} {}", self.sha256, self.path)
    }
}

/// Compute manifest entries for every regular, non-hidden file in `dist_dir`.
pub fn build_manifest(dist_dir: &Utf8Path) -> std::io::Result<Vec<ManifestEntry>> {
    staged_files(dist_dir)?
        .into_iter()
        .map(|name| {
            let path = dist_dir.join(&name);
            Ok(ManifestEntry {
                sha256: sha256_file(&path)?,
                path,
            })
        })
        .collect()
}

/// Render entries one per line.
pub fn render(entries: &[ManifestEntry]) -> String {
    entries.iter().map(|e| format!("{e}\n")).collect()
}

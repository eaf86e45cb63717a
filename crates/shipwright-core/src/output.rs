//! `name=value` outputs for later CI steps.

use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// Environment variable GitHub Actions uses for step outputs.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// The output file: the configured one, else `$GITHUB_OUTPUT`.
pub fn output_target(configured: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    configured.map(Utf8Path::to_path_buf).or_else(|| {
        std::env::var(GITHUB_OUTPUT_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Utf8PathBuf::from)
    })
}

/// Append `key=value` to `target`, creating the file if needed.
///
/// Does nothing when there is no target.
pub fn emit(key: &str, value: &str, target: Option<&Utf8Path>) -> std::io::Result<()> {
    let Some(target) = target else {
        return Ok(());
    };
    let mut file = OpenOptions::new().create(true).append(true).open(target)?;
    writeln!(file, "{key}={value}")?;
    debug!(%key, %target, "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_lines() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("out.env")).unwrap();
        std::fs::write(&path, "existing=1\n").unwrap();

        emit("release_url", "https://github.com/foo/bar/releases/tag/v1", Some(path.as_path())).unwrap();
        emit("tag", "v1", Some(path.as_path())).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing=1\nrelease_url=https://github.com/foo/bar/releases/tag/v1\ntag=v1\n"
        );
    }

    #[test]
    fn no_target_is_a_no_op() {
        emit("release_url", "x", None).unwrap();
    }

    #[test]
    fn configured_target_wins() {
        let configured = Utf8PathBuf::from("/tmp/configured.env");
        assert_eq!(output_target(Some(configured.as_path())), Some(configured));
    }
}

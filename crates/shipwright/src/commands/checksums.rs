//! Checksums command: print the manifest lines for the release commit.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use tracing::{debug, instrument};

use shipwright_core::config::Config;
use shipwright_core::manifest;

/// Arguments for the `checksums` subcommand.
#[derive(Args, Debug, Default)]
pub struct ChecksumsArgs {
    /// Directory holding the built distributions
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,
}

/// Print one `sha256:<hex> <path>` line per distribution file.
///
/// Paths are printed as given (relative to the working directory unless the
/// directory is absolute) since that is how they appear in commit messages.
#[instrument(name = "cmd_checksums", skip_all)]
pub fn cmd_checksums(args: ChecksumsArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    let dir = args.dist_dir.unwrap_or_else(|| config.dist_dir());
    debug!(json_output = global_json, %dir, "executing checksums command");

    let entries =
        manifest::build_manifest(&dir).with_context(|| format!("failed to read {dir}"))?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", manifest::render(&entries));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_an_error() {
        let args = ChecksumsArgs {
            dist_dir: Some("/nonexistent/dist".into()),
        };
        assert!(cmd_checksums(args, false, &Config::default()).is_err());
    }

    #[test]
    fn json_output_succeeds() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo-1.0.0.tgz"), b"npm").unwrap();
        let args = ChecksumsArgs {
            dist_dir: Some(Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap()),
        };
        assert!(cmd_checksums(args, true, &Config::default()).is_ok());
    }
}

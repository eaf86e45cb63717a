//! External command execution.
//!
//! Everything shipwright delegates to another tool (git, `twine`, `npm`,
//! distribution checkers) goes through a [`CommandRunner`]. Production code
//! uses [`ShellRunner`], which hands the command line to `sh -c` so that
//! configured templates can carry their own flags, pipes, and quoting.
//!
//! # Templates
//!
//! Command templates may name the file they operate on with `{file}`. When
//! the placeholder is absent the (quoted) file name is appended, so both
//! `twine upload` and `twine upload --skip-existing {file}` work.

use std::process::Command;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from running an external command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The shell could not be spawned.
    #[error("failed to execute `{command}`: {source}")]
    Exec {
        /// The command line that was attempted.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` failed ({}): {stderr}", describe_exit(.exit_code))]
    Failed {
        /// The command line that failed.
        command: String,
        /// The exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr, trimmed.
        stderr: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"))
}

/// Result alias for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Captured result of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock time the command took.
    pub duration: Duration,
}

/// Capability to run a command line in a working directory.
///
/// Implementations block until the command finishes and return an error for
/// any non-zero exit.
pub trait CommandRunner {
    /// Run `command` with `cwd` as its working directory.
    fn run(&self, command: &str, cwd: &Utf8Path) -> CommandResult<CommandOutput>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    #[instrument(skip(self), fields(%cwd))]
    fn run(&self, command: &str, cwd: &Utf8Path) -> CommandResult<CommandOutput> {
        debug!(%command, "running command");

        let start = Instant::now();
        let output = Command::new("sh")
            .args(["-c", command])
            .current_dir(cwd.as_std_path())
            .output()
            .map_err(|source| CommandError::Exec {
                command: command.to_string(),
                source,
            })?;
        let duration = start.elapsed();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(elapsed_ms = duration.as_millis() as u64, "command finished");
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        })
    }
}

/// Render a command template against a file name.
pub fn render_template(template: &str, file: &str) -> String {
    let quoted = shell_quote(file);
    if template.contains("{file}") {
        template.replace("{file}", &quoted)
    } else {
        format!("{} {quoted}", template.trim_end())
    }
}

/// Quote a single shell word, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '+' | '=' | ','));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// The program name a command template would invoke, if any.
///
/// Skips leading `VAR=value` assignments so `TWINE_NON_INTERACTIVE=1 twine upload`
/// reports `twine`.
pub fn program_name(template: &str) -> Option<&str> {
    template
        .split_whitespace()
        .find(|word| !(word.contains('=') && !word.starts_with('=')))
}

//! Preflight checks for release readiness.
//!
//! Validates credentials, the local checkout, the staged distributions, and
//! tool availability before a release. Returns structured results that the
//! CLI formats.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::command::{CommandRunner, program_name};
use crate::config::Config;
use crate::dist::{Checkers, DistKind, check_dist};
use crate::git;
use crate::publish::staged_files;

/// A single preflight check result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Human-readable name of the check.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Description of the result (reason for failure, or confirmation).
    pub message: String,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
        }
    }

    fn fail(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
        }
    }
}

/// Full preflight report.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    /// Individual check results.
    pub checks: Vec<CheckResult>,
    /// Whether all checks passed.
    pub all_passed: bool,
    /// Staging directory that was inspected.
    pub dist_dir: Utf8PathBuf,
}

/// Run all preflight checks.
///
/// `dist_dir` is resolved against `cwd` when relative. `token_present`
/// reports whether a GitHub token was supplied; the token itself never
/// reaches this module.
#[instrument(skip(runner, config))]
pub fn run_preflight(
    runner: &dyn CommandRunner,
    cwd: &Utf8Path,
    config: &Config,
    token_present: bool,
) -> PreflightReport {
    let dist_dir = cwd.join(config.dist_dir());
    let mut checks = vec![check_token(token_present)];

    let git_found = has_program("git");
    checks.push(if git_found {
        CheckResult::pass("Git", "git is installed")
    } else {
        CheckResult::fail("Git", "git not found on PATH")
    });
    if git_found {
        checks.push(check_git_repo(runner, cwd));
    }

    let staged = staged_files(&dist_dir).unwrap_or_default();
    checks.push(check_dist_files(runner, &dist_dir, &staged));
    checks.push(check_upload_tools(config, &staged));

    let all_passed = checks.iter().all(|c| c.passed);
    debug!(all_passed, check_count = checks.len(), "preflight complete");

    PreflightReport {
        checks,
        all_passed,
        dist_dir,
    }
}

fn check_token(present: bool) -> CheckResult {
    if present {
        CheckResult::pass("GitHub token", "Token provided")
    } else {
        CheckResult::fail(
            "GitHub token",
            "No token: pass --auth or set GITHUB_ACCESS_TOKEN",
        )
    }
}

fn check_git_repo(runner: &dyn CommandRunner, cwd: &Utf8Path) -> CheckResult {
    const NAME: &str = "Git repository";
    match git::is_inside_repo(runner, cwd) {
        Ok(true) => match git::remote_url(runner, cwd, "origin") {
            Ok(Some(url)) => match git::parse_owner_repo(&url) {
                Some(repo) => CheckResult::pass(NAME, format!("origin is {repo}")),
                None => CheckResult::fail(NAME, format!("origin {url} is not a GitHub repository")),
            },
            Ok(None) => CheckResult::fail(NAME, "No origin remote"),
            Err(e) => CheckResult::fail(NAME, format!("Failed to check: {e}")),
        },
        Ok(false) => CheckResult::fail(NAME, "Not inside a git repository"),
        Err(e) => CheckResult::fail(NAME, format!("Failed to check: {e}")),
    }
}

fn check_dist_files(runner: &dyn CommandRunner, dist_dir: &Utf8Path, staged: &[String]) -> CheckResult {
    const NAME: &str = "Distributions";
    if staged.is_empty() {
        return CheckResult::fail(NAME, format!("No files in {dist_dir}"));
    }

    // Structural checks only; configured checkers run during extract.
    let checkers = Checkers::default();
    let mut bad = Vec::new();
    let mut publishable = 0;
    for name in staged {
        match check_dist(runner, &checkers, &dist_dir.join(name)) {
            Ok(DistKind::Other) => {}
            Ok(_) => publishable += 1,
            Err(e) => bad.push(e.to_string()),
        }
    }

    if !bad.is_empty() {
        CheckResult::fail(NAME, bad.join("; "))
    } else if publishable == 0 {
        CheckResult::fail(NAME, format!("No publishable files in {dist_dir}"))
    } else {
        CheckResult::pass(NAME, format!("{publishable} publishable files in {dist_dir}"))
    }
}

/// Only the tools the staged files need are required. With nothing staged,
/// every configured tool is checked.
fn check_upload_tools(config: &Config, staged: &[String]) -> CheckResult {
    const NAME: &str = "Upload tools";
    let kinds: Vec<DistKind> = staged.iter().map(|n| DistKind::from_name(n)).collect();
    let need_python = staged.is_empty() || kinds.iter().any(|k| k.is_python());
    let need_npm = staged.is_empty() || kinds.contains(&DistKind::Npm);

    let mut missing = Vec::new();
    for (needed, template) in [(need_python, config.twine_cmd()), (need_npm, config.npm_cmd())] {
        if !needed {
            continue;
        }
        match program_name(template) {
            Some(program) if has_program(program) => {}
            Some(program) => missing.push(program.to_string()),
            None => missing.push(format!("(empty command {template:?})")),
        }
    }

    if missing.is_empty() {
        CheckResult::pass(NAME, "All required tools are installed")
    } else {
        CheckResult::fail(NAME, format!("Missing tools: {}", missing.join(", ")))
    }
}

fn has_program(name: &str) -> bool {
    which::which(name).is_ok()
}

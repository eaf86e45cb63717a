//! Command implementations

pub mod checksums;

pub mod delete;

pub mod doctor;

pub mod draft;

pub mod extract;

pub mod info;

pub mod preflight;

pub mod publish;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::debug;

use shipwright_core::config::Config;
use shipwright_core::event::{ReleaseEvent, StepOutcome};
use shipwright_core::github::GitHubClient;
use shipwright_core::output;

/// GitHub connection flags shared by the release commands.
#[derive(Args, Debug, Default, Clone)]
pub struct GitHubArgs {
    /// GitHub token (falls back to GITHUB_ACCESS_TOKEN)
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub auth: Option<String>,
}

impl GitHubArgs {
    /// Build the API client against the configured API root.
    pub fn client(&self, config: &Config) -> GitHubClient {
        let token = self.auth.clone().filter(|t| !t.is_empty());
        if token.is_none() {
            debug!("no GitHub token; requests are anonymous");
        }
        GitHubClient::new(config.api_url(), token)
    }
}

/// The staging directory: the flag, else config, resolved against `cwd`.
pub fn dist_dir(cwd: &Utf8Path, flag: Option<&Utf8Path>, config: &Config) -> Utf8PathBuf {
    flag.map_or_else(|| cwd.join(config.dist_dir()), |dir| cwd.join(dir))
}

/// Report the release URL on stdout and to the CI output file.
///
/// In JSON mode stdout carries the outcome document instead.
pub fn report_release_url(url: &str, config: &Config, json: bool) -> anyhow::Result<()> {
    if !json {
        println!("release_url={url}");
    }
    let target = output::output_target(config.output_file());
    output::emit("release_url", url, target.as_deref())
        .with_context(|| format!("failed to write output file {}", target.unwrap_or_default()))
}

/// Whether prompting is possible and wanted.
pub fn interactive(json: bool) -> bool {
    !json && std::io::IsTerminal::is_terminal(&std::io::stdin())
}

/// Renders [`ReleaseEvent`]s on stderr.
///
/// A spinner runs while a step is in progress; completed steps leave a
/// one-line summary.
pub struct Progress {
    enabled: bool,
    dry_run: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    /// `enabled` is false for JSON output.
    pub const fn new(enabled: bool, dry_run: bool) -> Self {
        Self {
            enabled,
            dry_run,
            spinner: None,
        }
    }

    /// Handle one event.
    pub fn handle(&mut self, event: ReleaseEvent) {
        if !self.enabled {
            return;
        }
        match event {
            ReleaseEvent::StepStarted(step) => {
                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                    spinner.set_style(
                        style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                    );
                }
                spinner.set_message(format!("{step}..."));
                spinner.enable_steady_tick(std::time::Duration::from_millis(80));
                self.finish();
                self.spinner = Some(spinner);
            }
            ReleaseEvent::Item { step, name } => {
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(format!("{step}: {name}"));
                }
                debug!(%step, %name, "working");
            }
            ReleaseEvent::StepCompleted(step, outcome) => {
                self.finish();
                match outcome {
                    StepOutcome::Success { message } => {
                        let prefix = if self.dry_run { "○" } else { "✓" };
                        eprintln!(
                            "  {} {} {}",
                            prefix.green(),
                            step.to_string().bold(),
                            message.dimmed()
                        );
                    }
                    StepOutcome::Skipped { reason } => {
                        eprintln!(
                            "  {} {} {}",
                            "–".yellow(),
                            step.to_string().bold(),
                            format!("skipped: {reason}").dimmed()
                        );
                    }
                }
            }
        }
    }

    fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_core::event::ReleaseStep;

    #[test]
    fn dist_dir_prefers_flag() {
        let config = Config::default();
        let cwd = Utf8Path::new("/work");
        assert_eq!(dist_dir(cwd, None, &config), "/work/dist");
        assert_eq!(dist_dir(cwd, Some(Utf8Path::new("out")), &config), "/work/out");
        assert_eq!(dist_dir(cwd, Some(Utf8Path::new("/abs")), &config), "/abs");
    }

    #[test]
    fn progress_handles_a_full_step() {
        let mut progress = Progress::new(true, false);
        progress.handle(ReleaseEvent::StepStarted(ReleaseStep::Fetch));
        progress.handle(ReleaseEvent::Item {
            step: ReleaseStep::Fetch,
            name: "foo.whl".into(),
        });
        assert!(progress.spinner.is_some());
        progress.handle(ReleaseEvent::StepCompleted(
            ReleaseStep::Fetch,
            StepOutcome::Success {
                message: "1 asset".into(),
            },
        ));
        assert!(progress.spinner.is_none());
    }

    #[test]
    fn disabled_progress_ignores_events() {
        let mut progress = Progress::new(false, false);
        progress.handle(ReleaseEvent::StepStarted(ReleaseStep::Delete));
        assert!(progress.spinner.is_none());
    }
}

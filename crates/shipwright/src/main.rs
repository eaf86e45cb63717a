//! shipwright CLI
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use shipwright::{Cli, Commands, commands};
use shipwright_core::config::ConfigLoader;
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = camino::Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = camino::Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "config path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&config_path);
    }
    let config = loader.load().context("failed to load configuration")?;

    let obs_config = observability::ObservabilityConfig::new(config.log_dir.clone());
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter, cli.quiet);

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let result = match cli.command {
        Commands::ExtractRelease(args) => {
            commands::extract::cmd_extract(args, cli.json, &config, &cwd)
        }
        Commands::PublishRelease(args) => {
            commands::publish::cmd_publish(args, cli.json, &config, &cwd)
        }
        Commands::DeleteRelease(args) => commands::delete::cmd_delete(args, cli.json, &config),
        Commands::DraftRelease(args) => commands::draft::cmd_draft(args, cli.json, &config, &cwd),
        Commands::Checksums(args) => commands::checksums::cmd_checksums(args, cli.json, &config),
        Commands::Preflight(args) => {
            commands::preflight::cmd_preflight(args, cli.json, &config, &cwd)
        }
        Commands::Doctor(args) => commands::doctor::cmd_doctor(args, cli.json, &cwd),
        Commands::Info(args) => commands::info::cmd_info(args, cli.json, &config, &cwd),
    };
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}

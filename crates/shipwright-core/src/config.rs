//! Configuration loading and discovery.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `~/.config/shipwright/config.<ext>` (user config)
//! 3. `.shipwright.<ext>` or `shipwright.<ext>` in the current directory or
//!    any parent, stopping at a `.git` boundary (project config)
//! 4. Files passed explicitly (`--config`), later ones winning
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//!
//! ```toml
//! log_level = "debug"
//!
//! [github]
//! api_url = "https://github.example.com/api/v3"
//!
//! [dist]
//! dir = "dist"
//!
//! [commands]
//! twine = "twine upload --skip-existing"
//! npm = "npm publish --access public"
//! check_python = "twine check"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::dist::Checkers;
use crate::error::{ConfigError, ConfigResult};
use crate::github::DEFAULT_API_URL;
use crate::publish::{DEFAULT_NPM_CMD, DEFAULT_TWINE_CMD};

/// Staging directory used when nothing else is configured.
pub const DEFAULT_DIST_DIR: &str = "dist";

/// The configuration for shipwright.
///
/// Every section is optional; accessors fall back to built-in defaults and
/// CLI flags override whatever the accessors return.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// GitHub API settings.
    pub github: Option<GitHubConfig>,
    /// Distribution staging settings.
    pub dist: Option<DistConfig>,
    /// Command templates for uploads and checks.
    pub commands: Option<CommandsConfig>,
    /// CI output settings.
    pub output: Option<OutputConfig>,
}

/// GitHub API settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitHubConfig {
    /// API root, for GitHub Enterprise (default: `https://api.github.com`).
    pub api_url: Option<String>,
}

/// Distribution staging settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DistConfig {
    /// Directory assets are downloaded into and published from.
    pub dir: Option<Utf8PathBuf>,
}

/// Command templates.
///
/// A template may contain `{file}`; otherwise the file name is appended.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandsConfig {
    /// Upload command for wheels and sdists (default: `twine upload`).
    pub twine: Option<String>,
    /// Publish command for npm tarballs (default: `npm publish`).
    pub npm: Option<String>,
    /// Extra checker for Python distributions, e.g. `twine check`.
    pub check_python: Option<String>,
    /// Extra checker for npm tarballs.
    pub check_npm: Option<String>,
}

/// CI output settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// File to append `name=value` outputs to (default: `$GITHUB_OUTPUT`).
    pub file: Option<Utf8PathBuf>,
}

impl Config {
    /// GitHub API root.
    pub fn api_url(&self) -> &str {
        self.github
            .as_ref()
            .and_then(|g| g.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Staging directory.
    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.dist
            .as_ref()
            .and_then(|d| d.dir.clone())
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DIST_DIR))
    }

    /// Upload command template for Python distributions.
    pub fn twine_cmd(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.twine.as_deref())
            .unwrap_or(DEFAULT_TWINE_CMD)
    }

    /// Publish command template for npm tarballs.
    pub fn npm_cmd(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.npm.as_deref())
            .unwrap_or(DEFAULT_NPM_CMD)
    }

    /// Configured distribution checkers.
    pub fn checkers(&self) -> Checkers {
        self.commands.as_ref().map_or_else(Checkers::default, |c| Checkers {
            python: c.check_python.clone(),
            npm: c.check_npm.clone(),
        })
    }

    /// Configured output file, if any.
    pub fn output_file(&self) -> Option<&Utf8Path> {
        self.output.as_ref().and_then(|o| o.file.as_deref())
    }

    /// Reject values that would only fail later, mid-release.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        let api_url = self.api_url();
        if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                key: "github.api_url",
                message: format!("expected an http(s) URL, got {api_url:?}"),
            });
        }

        if let Some(commands) = &self.commands {
            for (key, value) in [
                ("commands.twine", &commands.twine),
                ("commands.npm", &commands.npm),
                ("commands.check_python", &commands.check_python),
                ("commands.check_npm", &commands.check_npm),
            ] {
                if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        key,
                        message: "command must not be empty".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "shipwright";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load.
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/shipwright/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop walking up at a directory containing `marker` (default `.git`).
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load. Later files take precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load and validate configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            tracing::debug!(path = %user_config, "user config");
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            tracing::debug!(path = %project_config, "project config");
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            if !file.is_file() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        config.validate()?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            api_url = config.api_url(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // The boundary directory itself is searched, nothing above it.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/shipwright/` on Linux, `~/Library/Application Support/shipwright/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
///
/// Log files go here unless configured otherwise.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, name: &str, body: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(tmp.path().join(name)).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    fn load_file(path: &Utf8Path) -> ConfigResult<Config> {
        ConfigLoader::new().with_user_config(false).with_file(path).load()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.api_url(), "https://api.github.com");
        assert_eq!(config.dist_dir(), "dist");
        assert_eq!(config.twine_cmd(), "twine upload");
        assert_eq!(config.npm_cmd(), "npm publish");
        assert!(config.checkers().python.is_none());
        assert!(config.output_file().is_none());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_all_sections_from_toml() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "config.toml",
            r#"
log_level = "debug"
log_dir = "/var/log/shipwright"

[github]
api_url = "https://ghe.example.com/api/v3"

[dist]
dir = "build/dist"

[commands]
twine = "twine upload --skip-existing"
npm = "npm publish --access public"
check_python = "twine check"

[output]
file = "out.env"
"#,
        );

        let config = load_file(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api_url(), "https://ghe.example.com/api/v3");
        assert_eq!(config.dist_dir(), "build/dist");
        assert_eq!(config.twine_cmd(), "twine upload --skip-existing");
        assert_eq!(config.npm_cmd(), "npm publish --access public");
        assert_eq!(config.checkers().python.as_deref(), Some("twine check"));
        assert!(config.checkers().npm.is_none());
        assert_eq!(config.output_file().map(Utf8Path::as_str), Some("out.env"));
    }

    #[test]
    fn test_yaml_and_json_formats() {
        let tmp = TempDir::new().unwrap();
        let yaml = write_config(&tmp, "c.yaml", "commands:\n  npm: pnpm publish\n");
        assert_eq!(load_file(&yaml).unwrap().npm_cmd(), "pnpm publish");

        let json = write_config(&tmp, "c.json", r#"{"dist": {"dir": "out"}}"#);
        assert_eq!(load_file(&json).unwrap().dist_dir(), "out");
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = write_config(&tmp, "base.toml", "[commands]\ntwine = \"twine upload\"\nnpm = \"npm publish\"");
        let over = write_config(&tmp, "override.toml", "[commands]\nnpm = \"yarn npm publish\"");

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(&base)
            .with_file(&over)
            .load()
            .unwrap();

        assert_eq!(config.npm_cmd(), "yarn npm publish");
        assert_eq!(config.twine_cmd(), "twine upload");
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".shipwright.toml"), r#"log_level = "debug""#).unwrap();

        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".shipwright.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_beside_boundary_marker_is_found() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let src = repo.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join("shipwright.toml"), r#"log_level = "error""#).unwrap();

        let src = Utf8PathBuf::try_from(src).unwrap();
        let found = find_project_config(&src).unwrap();
        assert!(found.ends_with("repo/shipwright.toml"), "{found}");
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        write_config(&tmp, ".shipwright.toml", r#"log_level = "warn""#);
        let over = write_config(&tmp, "override.toml", r#"log_level = "error""#);
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(&root)
            .with_file(&over)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_file(Utf8Path::new("/nonexistent/shipwright.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "c.toml", "[github]\napi_url = \"api.github.com\"");
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "github.api_url", .. }));
    }

    #[test]
    fn test_empty_command_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "c.toml", "[commands]\ntwine = \"  \"");
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("commands.twine"), "{err}");
    }

    #[test]
    fn test_bad_log_level_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "c.toml", r#"log_level = "loud""#);
        assert!(matches!(load_file(&path), Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("shipwright"));
        }
    }
}

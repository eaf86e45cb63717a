//! Logging setup.
//!
//! Stdout carries command output (release URLs, checksum lines, JSON), so
//! nothing here ever writes to it. Every event that passes the filter lands
//! in a daily-rolled JSONL file; warnings and errors are echoed to stderr.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Context as _, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use shipwright_core::config::user_data_local_dir;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "SHIPWRIGHT_LOG_PATH";
const ENV_LOG_DIR: &str = "SHIPWRIGHT_LOG_DIR";
const SYSTEM_LOG_DIR: &str = "/var/log";

/// Logging settings that come from configuration.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Name used for the log file.
    pub service: String,
    /// `log_dir` from the config file.
    pub log_dir: Option<Utf8PathBuf>,
}

impl ObservabilityConfig {
    /// Settings for this binary, with the configured log directory.
    pub fn new(log_dir: Option<Utf8PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _writer: WorkerGuard,
}

/// Install the global subscriber.
///
/// When no log file can be opened, JSON lines go to stderr instead and a
/// warning says why.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
    quiet: bool,
) -> ObservabilityGuard {
    let sources = LogSources::from_env(cfg.log_dir.as_deref());
    let (writer, guard) = match sources.resolve(&cfg.service) {
        Ok(file) => file.writer(),
        Err(err) => {
            eprintln!("Warning: {err:#}. Logging to stderr instead.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let echo_level = if quiet { LevelFilter::ERROR } else { LevelFilter::WARN };
    let echo = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(echo_level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonlLayer { writer })
        .with(echo)
        .init();

    tracing::debug!("observability initialized");
    ObservabilityGuard { _writer: guard }
}

/// Filter for the file log.
///
/// `--quiet` beats `-v`/`-vv`, which beat `RUST_LOG`, which beats the
/// configured level.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level)),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    }
}

// ---------------------------------------------------------------------------
// Log file resolution
// ---------------------------------------------------------------------------

/// A log file known to be appendable.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogFile {
    dir: Utf8PathBuf,
    name: String,
}

impl LogFile {
    /// Create `dir` if needed and check that `name` can be appended to.
    fn open(dir: &Utf8Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {dir}"))?;
        let path = dir.join(name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file {path}"))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
        })
    }

    fn writer(&self) -> (NonBlocking, WorkerGuard) {
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&self.dir, &self.name))
    }
}

/// Places the log may go, highest priority first.
///
/// An explicit path or directory that cannot be used is an error; only the
/// fallbacks are tried in turn.
#[derive(Debug, Default)]
struct LogSources {
    path: Option<Utf8PathBuf>,
    dir: Option<Utf8PathBuf>,
    configured: Option<Utf8PathBuf>,
    fallbacks: Vec<Utf8PathBuf>,
}

impl LogSources {
    fn from_env(configured: Option<&Utf8Path>) -> Self {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.is_empty())
                .map(Utf8PathBuf::from)
        };

        let mut fallbacks = Vec::new();
        if cfg!(unix) {
            fallbacks.push(Utf8PathBuf::from(SYSTEM_LOG_DIR));
        }
        if let Some(data) = user_data_local_dir() {
            fallbacks.push(data.join("logs"));
        }
        if let Ok(cwd) = std::env::current_dir()
            && let Ok(cwd) = Utf8PathBuf::try_from(cwd)
        {
            fallbacks.push(cwd);
        }

        Self {
            path: var(ENV_LOG_PATH),
            dir: var(ENV_LOG_DIR),
            configured: configured.map(Utf8Path::to_path_buf),
            fallbacks,
        }
    }

    fn resolve(&self, service: &str) -> Result<LogFile> {
        let name = format!("{service}.jsonl");

        if let Some(path) = &self.path {
            let Some(file_name) = path.file_name() else {
                bail!("{ENV_LOG_PATH} must name a file, got {path}");
            };
            let dir = path
                .parent()
                .filter(|p| !p.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            return LogFile::open(dir, file_name);
        }

        if let Some(dir) = self.dir.as_ref().or(self.configured.as_ref()) {
            return LogFile::open(dir, &name);
        }

        self.fallbacks
            .iter()
            .find_map(|dir| LogFile::open(dir, &name).ok())
            .context("no writable log directory found")
    }
}

// ---------------------------------------------------------------------------
// JSONL layer
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    level: String,
    target: &'a str,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// Writes one JSON object per event, with the fields of every enclosing
/// span merged in (innermost wins).
struct JsonlLayer<W> {
    writer: W,
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut fields = JsonFields::default();
            attrs.record(&mut fields);
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            if let Some(fields) = extensions.get_mut::<JsonFields>() {
                values.record(fields);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = JsonFields::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(span_fields) = span.extensions().get::<JsonFields>() {
                    fields.0.extend(span_fields.0.clone());
                }
            }
        }
        event.record(&mut fields);

        let meta = event.metadata();
        let line = LogLine {
            timestamp: timestamp(),
            level: meta.level().as_str().to_ascii_lowercase(),
            target: meta.target(),
            fields: fields.0,
        };
        if let Ok(mut bytes) = serde_json::to_vec(&line) {
            bytes.push(b'\n');
            let _ = self.writer.make_writer().write_all(&bytes);
        }
    }
}

/// Recorded field values.
#[derive(Clone, Debug, Default)]
struct JsonFields(Map<String, Value>);

impl JsonFields {
    fn put(&mut self, field: &Field, value: impl Into<Value>) {
        self.0.insert(field.name().to_string(), value.into());
    }
}

impl Visit for JsonFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

/// Current UTC time, RFC 3339 with milliseconds.
fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn utf8(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn env_filter_quiet_beats_verbose() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_levels() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn log_path_wins_over_directories() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(&tmp);
        let sources = LogSources {
            path: Some(root.join("ci/run.jsonl")),
            dir: Some(root.join("env-dir")),
            configured: Some(root.join("config-dir")),
            fallbacks: Vec::new(),
        };

        let file = sources.resolve("shipwright").unwrap();

        assert_eq!(file.dir, root.join("ci"));
        assert_eq!(file.name, "run.jsonl");
        assert!(root.join("ci/run.jsonl").exists());
    }

    #[test]
    fn env_dir_beats_configured_dir() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(&tmp);
        let sources = LogSources {
            dir: Some(root.join("env-dir")),
            configured: Some(root.join("config-dir")),
            ..LogSources::default()
        };

        let file = sources.resolve("shipwright").unwrap();
        assert_eq!(file.dir, root.join("env-dir"));
        assert_eq!(file.name, "shipwright.jsonl");

        let sources = LogSources {
            configured: Some(root.join("config-dir")),
            ..LogSources::default()
        };
        assert_eq!(sources.resolve("shipwright").unwrap().dir, root.join("config-dir"));
    }

    #[test]
    fn unusable_explicit_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(&tmp);
        std::fs::write(root.join("not-a-dir"), b"").unwrap();
        let sources = LogSources {
            dir: Some(root.join("not-a-dir/logs")),
            fallbacks: vec![root.clone()],
            ..LogSources::default()
        };

        let err = sources.resolve("shipwright").unwrap_err();
        assert!(format!("{err:#}").contains("cannot create log directory"));
    }

    #[test]
    fn fallbacks_skip_unusable_directories() {
        let tmp = TempDir::new().unwrap();
        let root = utf8(&tmp);
        std::fs::write(root.join("blocker"), b"").unwrap();
        let sources = LogSources {
            fallbacks: vec![root.join("blocker/logs"), root.join("data/logs")],
            ..LogSources::default()
        };

        assert_eq!(sources.resolve("shipwright").unwrap().dir, root.join("data/logs"));
    }

    #[test]
    fn no_fallbacks_left_is_an_error() {
        let err = LogSources::default().resolve("shipwright").unwrap_err();
        assert_eq!(err.to_string(), "no writable log directory found");
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn jsonl_lines_carry_span_fields() {
        let capture = Capture::default();
        let sink = capture.clone();
        let subscriber = tracing_subscriber::registry().with(JsonlLayer {
            writer: move || sink.clone(),
        });

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("verify", tag = "v1.0.0", assets = 2_u64);
            let _entered = span.enter();
            tracing::warn!(asset = "foo.whl", "checksum mismatch");
        });

        let raw = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let line: Value = serde_json::from_str(raw.trim_end()).unwrap();
        assert_eq!(line["level"], "warn");
        assert_eq!(line["message"], "checksum mismatch");
        assert_eq!(line["tag"], "v1.0.0");
        assert_eq!(line["assets"], 2);
        assert_eq!(line["asset"], "foo.whl");
        assert!(line["target"].as_str().unwrap().starts_with("shipwright"));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn timestamp_is_rfc3339_millis() {
        let ts = timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok(), "{ts}");
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 24);
    }
}

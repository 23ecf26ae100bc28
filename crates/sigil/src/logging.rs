//! # Logging
//!
//! `tracing` based logging for the signing core and the CLI.
//!
//! Every component logs under its own target (`sigil::dispatcher`,
//! `sigil::resolver`, `sigil::broadcast`, ...), so a filter such as
//! `RUST_LOG=sigil::dispatcher=debug` isolates one stage of the flow.
//! Dispatches run inside a span carrying a correlation id.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sigil::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("logging");
//! tracing::info!("ready");
//! ```
//!
//! ## Redaction
//!
//! Signatures and keys never reach the logs in full:
//!
//! ```
//! use sigil::logging::{redact_bytes, redact_sensitive};
//!
//! assert_eq!(redact_sensitive("0123456789abcdef"), "0123***cdef");
//! assert_eq!(redact_bytes(&[0xde, 0xad]), "***");
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file or its directory could not be created.
    #[error("Failed to create log file: {0}")]
    FileCreation(String),

    /// A global subscriber is already installed.
    #[error("Failed to initialize logging: {0}")]
    SubscriberInit(String),

    /// The filter or file path is invalid.
    #[error("Invalid log configuration: {0}")]
    InvalidConfig(String),
}

/// Minimum severity that is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The matching `tracing` level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Filter directive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, colored. For interactive use.
    #[default]
    Pretty,
    /// One JSON object per event. For log aggregation.
    Json,
    /// Single line per event.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Compact => "compact",
        })
    }
}

/// Logging configuration.
///
/// ```
/// use sigil::logging::{LogConfig, LogFormat, LogLevel};
///
/// let config = LogConfig {
///     level: LogLevel::Debug,
///     format: LogFormat::Json,
///     ..Default::default()
/// };
/// assert!(config.file_path.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level. A set `RUST_LOG` takes precedence.
    pub level: LogLevel,

    /// Output format for stderr and, when set, the log file.
    pub format: LogFormat,

    /// Optional file, rotated daily. The directory is created if missing.
    pub file_path: Option<PathBuf>,

    /// Record span close events, which carry the correlation id of each
    /// dispatch in pretty output.
    pub correlation_ids: bool,
}

/// Keeps the non-blocking file writer alive. Dropping it flushes the file.
pub struct LogGuard {
    guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogGuard {
    const fn new(guard: Option<tracing_appender::non_blocking::WorkerGuard>) -> Self {
        Self { guard }
    }
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LogError`] if the filter is invalid, the log file cannot be
/// created, or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.as_str())
            .map_err(|e| LogError::InvalidConfig(e.to_string()))?,
    };

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config)];
    let mut guard = None;

    if let Some(path) = &config.file_path {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LogError::InvalidConfig("invalid log file name".to_string()))?;

        let (writer, worker) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, file_name));
        guard = Some(worker);

        let file_layer = match config.format {
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            LogFormat::Pretty | LogFormat::Compact => fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .boxed(),
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard::new(guard))
}

fn stderr_layer(config: &LogConfig) -> BoxedLayer {
    let span_events = if config.correlation_ids {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    }
}

/// Partially masks a secret-like string: the first and last four characters
/// survive when the value has at least twelve, otherwise it becomes `***`.
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    if chars.len() < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars.iter().take(VISIBLE_CHARS).collect();
    let suffix: String = chars
        .iter()
        .skip(chars.len() - VISIBLE_CHARS)
        .collect();
    format!("{prefix}***{suffix}")
}

/// [`redact_sensitive`] over the hex rendering of `bytes`.
#[must_use]
pub fn redact_bytes(bytes: &[u8]) -> String {
    redact_sensitive(&hex::encode(bytes))
}

/// A fresh 32-character hex correlation id.
///
/// Ids are unique within a process and unlikely to collide across
/// processes; they are not secrets.
#[must_use]
pub fn new_correlation_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut seed = Vec::with_capacity(32);
    seed.extend_from_slice(&nanos.to_be_bytes());
    seed.extend_from_slice(&counter.to_be_bytes());
    seed.extend_from_slice(&std::process::id().to_be_bytes());
    let digest = sigil_crypto::sha256(&seed);

    let mut id = String::with_capacity(32);
    for byte in &digest[..16] {
        // Writing to a String cannot fail.
        let _ = write!(id, "{byte:02x}");
    }
    id
}

/// Opens an info span tagged with a correlation id.
///
/// ```
/// use sigil::logging::new_correlation_id;
///
/// let id = new_correlation_id();
/// let span = sigil::with_correlation_id!(id, "dispatch", chain_id = "osmosis-1");
/// let _entered = span.enter();
/// ```
#[macro_export]
macro_rules! with_correlation_id {
    ($id:expr, $name:expr) => {
        tracing::info_span!($name, correlation_id = %$id)
    };
    ($id:expr, $name:expr, $($fields:tt)*) => {
        tracing::info_span!($name, correlation_id = %$id, $($fields)*)
    };
}

/// Maps `-v` occurrences to a level: none is `warn`, then `info`, `debug`
/// and `trace`.
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Records a signing decision under the `sigil::audit` target.
///
/// Audit events are emitted at INFO so they survive the default `-v` filter
/// of operators who enable auditing with `RUST_LOG=sigil::audit=info`.
pub fn log_audit_event(event: &str, chain_id: &str, details: &str) {
    tracing::info!(
        target: "sigil::audit",
        audit_event = event,
        chain_id,
        details,
        "audit: {event}"
    );
}

//! Logging infrastructure - structured tracing for the bridge
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log level
//! - Zero-cost when disabled
//! - Span-based performance tracking of bridged calls
//! - Console or file output, human-readable or JSON

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Flush guard of the file writer, held for the life of the process
static FILE_GUARD: OnceCell<Mutex<WorkerGuard>> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console (stderr) when unset
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
    /// Log duration of each bridged call
    pub track_performance: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
            track_performance: cfg!(debug_assertions),
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // HOSTBRIDGE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("HOSTBRIDGE_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // HOSTBRIDGE_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("HOSTBRIDGE_LOG_FILE") {
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("HOSTBRIDGE_LOG_JSON").is_ok();
        config.show_spans = std::env::var("HOSTBRIDGE_LOG_SPANS").is_ok();

        if let Ok(val) = std::env::var("HOSTBRIDGE_LOG_PERF") {
            config.track_performance = val == "1" || val.to_lowercase() == "true";
        }

        config
    }

    /// Minimal logging for hot paths
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            log_path: None,
            json_format: false,
            show_spans: false,
            track_performance: false,
        }
    }

    /// Verbose logging to `hostbridge.log`
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: Some("hostbridge.log".to_string()),
            json_format: false,
            show_spans: true,
            track_performance: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration. Only the first call has
/// an effect; an already installed global subscriber is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("hostbridge={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let writer = match &config.log_path {
            Some(path) => file_writer(Path::new(path)),
            None => BoxMakeWriter::new(io::stderr),
        };

        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(true)
            .with_line_number(cfg!(debug_assertions));

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = if config.json_format {
            registry.with(layer.json()).try_init()
        } else {
            registry.with(layer).try_init()
        };

        if installed.is_ok() {
            PERF_ENABLED.get_or_init(|| config.track_performance);
        }
    });
}

fn file_writer(path: &Path) -> BoxMakeWriter {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map_or_else(|| "hostbridge.log".into(), |f| f.to_string_lossy().into_owned());

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(Mutex::new(guard));
    BoxMakeWriter::new(non_blocking)
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

static PERF_ENABLED: OnceCell<bool> = OnceCell::new();

/// Whether bridged calls are timed
#[inline]
pub fn performance_tracking() -> bool {
    PERF_ENABLED.get().copied().unwrap_or(false)
}

// ============================================================================
// Bridge-specific logging functions
// ============================================================================

/// Log a native function being wrapped for the host
pub fn log_wrap(fn_name: &str, signature: &str) {
    use tracing::debug;
    debug!(
        event = "bridge_wrap",
        function = fn_name,
        signature = signature,
        "Native function wrapped for host"
    );
}

/// Log a host call into a bridged function
pub fn log_bridge_call(fn_name: &str, arg_count: usize) {
    use tracing::debug;
    debug!(
        event = "bridge_call",
        function = fn_name,
        args = arg_count,
        "Bridged function called"
    );
}

/// Log a bridged function return
pub fn log_bridge_return(fn_name: &str, result_count: usize) {
    use tracing::trace;
    trace!(
        event = "bridge_return",
        function = fn_name,
        results = result_count,
        "Bridged function returned"
    );
}

/// Log a failed bridged call
pub fn log_bridge_error(fn_name: &str, category: &str, error: &str) {
    use tracing::warn;
    warn!(
        event = "bridge_error",
        function = fn_name,
        category = category,
        error = error,
        "Bridged call failed"
    );
}

/// Log type conversion
pub fn log_type_conversion(from_type: &str, to_type: &str) {
    use tracing::trace;
    trace!(
        event = "type_conversion",
        from = from_type,
        to = to_type,
        "Type conversion performed"
    );
}

/// Log a bulk byte copy
pub fn log_fast_path(direction: &str, bytes: usize) {
    use tracing::trace;
    trace!(
        event = "fast_path",
        direction = direction,
        size_bytes = bytes,
        "Byte buffer copied in bulk"
    );
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &str) -> PerformanceGuard {
        PerformanceGuard {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: String,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            debug!(
                operation = %self.operation,
                duration_us = elapsed.as_micros(),
                "operation completed"
            );
        }
    }
}

//! Log sinks and logger setup
//!
//! Observers write through a [`SharedSink`]: one mutex around one sink, so
//! every line is emitted whole even when events fire on many threads at once.
//! Sink failures are swallowed here and never reach the caller.

use eyre::{Context, Result};
use log::Level;
use once_cell::sync::Lazy;
use std::fmt;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{Config, LoggingConfig};

/// Log target used for observer output
pub const DEBUG_TARGET: &str = "event_tap::debug";

/// Destination for rendered lines
pub trait LogSink: Send {
    fn write_line(&mut self, level: Level, line: &str) -> io::Result<()>;

    /// Whether a line at this level would be kept; lets callers skip formatting
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Forwards lines to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn write_line(&mut self, level: Level, line: &str) -> io::Result<()> {
        log::log!(target: DEBUG_TARGET, level, "{}", line);
        Ok(())
    }

    fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: DEBUG_TARGET, level)
    }
}

/// A sink behind a single lock
pub struct SharedSink {
    inner: Mutex<Box<dyn LogSink>>,
}

impl SharedSink {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(sink)),
        }
    }

    /// Format and write one line while holding the lock
    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        self.emit_with(level, |line| {
            let _ = fmt::write(line, args);
        });
    }

    /// Build one line with `render` and write it while holding the lock
    pub fn emit_with(&self, level: Level, render: impl FnOnce(&mut String)) {
        let mut sink = self.lock();
        if !sink.enabled(level) {
            return;
        }

        let mut line = String::new();
        render(&mut line);

        // On failure the line is dropped.
        let _ = sink.write_line(level, &line);
    }

    // A panic in another writer must not silence the observer for good.
    fn lock(&self) -> MutexGuard<'_, Box<dyn LogSink>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSink").finish_non_exhaustive()
    }
}

static DEFAULT_SINK: Lazy<Arc<SharedSink>> = Lazy::new(|| Arc::new(SharedSink::new(LogCrateSink)));

/// The process-wide sink shared by observers registered without their own
pub fn default_sink() -> Arc<SharedSink> {
    Arc::clone(&DEFAULT_SINK)
}

/// Install `env_logger` as the global logger.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a logger is
/// already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let mut builder = env_logger::Builder::new();

    if rust_log.is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(config.level.as_filter());
    }

    if let Some(file) = &config.file {
        let path = Config::expand_path(file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }

        let target = Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .context("Failed to open log file")?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init().context("Failed to install logger")?;

    log::info!("Logging initialized, {}", describe_filter(rust_log.as_deref(), config));
    Ok(())
}

fn describe_filter(rust_log: Option<&str>, config: &LoggingConfig) -> String {
    match rust_log {
        Some(spec) => format!("filter RUST_LOG={}", spec),
        None => format!("level {} (from config)", config.level.as_filter()),
    }
}

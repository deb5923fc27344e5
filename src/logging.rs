// Logging for Perch.
//
// Built on the `tracing` ecosystem. Two layers live here:
//
// - subscriber initialization (`init` and its presets), installed once per
//   process with a `Once` guard;
// - the cached structured-logger facade (`get_cached_logger` / `Logger`)
//   that stamps the logger name, the current correlation id, and caller-
//   supplied fields onto every record.
//
// Logging is best-effort by construction: nothing on the emission path can
// fail, so a broken sink never surfaces into the caller's business logic.

use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};

use lazy_static::lazy_static;
use serde_json::{Map, Value};
use tracing::{Level, Subscriber};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

use crate::context;

/// Configuration for the subscriber installed by [`init`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: Level,
    /// Whether to use JSON format for logs.
    pub json_format: bool,
    /// Whether to include file and line information.
    pub show_file_line: bool,
    /// Whether to include thread name/id.
    pub show_thread_info: bool,
    /// Whether to include timestamps.
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...").
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Install the global tracing subscriber with the given configuration.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter =
            EnvFilter::from_default_env().add_directive(LevelFilter::from_level(config.level).into());

        if let Some(filters) = &config.target_filters {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        let registry = tracing_subscriber::registry().with(env_filter);

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else {
            let fmt_layer = fmt::layer()
                .with_ansi(atty::is(atty::Stream::Stdout))
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_thread_names(config.show_thread_info)
                .with_thread_ids(config.show_thread_info);
            if config.show_time {
                Box::new(registry.with(fmt_layer))
            } else {
                Box::new(registry.with(fmt_layer.without_time()))
            }
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Initialize with default settings (INFO level, human-readable console
/// output).
pub fn init_default() {
    init(LogConfig::default());
}

/// Initialize for development: DEBUG level, colored output, file/line info,
/// TRACE for the pool internals.
pub fn init_development() {
    let config = LogConfig {
        level: Level::DEBUG,
        json_format: false,
        show_file_line: true,
        show_thread_info: true,
        show_time: true,
        target_filters: Some("perch=debug,perch::pool=trace".to_string()),
    };
    init(config);
}

/// Initialize for production: INFO level, JSON output for log aggregators,
/// no file/line information.
pub fn init_production() {
    let config = LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    };
    init(config);
}

/// Initialize for tests: warnings and errors only, compact output.
pub fn init_test() {
    let config = LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    };
    init(config);
}

/// Get the current tracing dispatcher, for handing to spawned threads.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

/// A named, leveled structured-logger facade.
///
/// Obtained through [`get_cached_logger`]; at most one instance exists per
/// `(name, level)` pair for the process lifetime. Each record carries the
/// logger name, the current correlation id (when one is set), and the
/// caller-supplied fields as a JSON payload.
#[derive(Debug)]
pub struct Logger {
    name: String,
    level: Level,
}

impl Logger {
    fn new(name: &str, level: Level) -> Self {
        Self {
            name: name.to_string(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message, &[]);
    }

    pub fn debug_kv(&self, message: &str, fields: &[(&str, Value)]) {
        self.log(Level::DEBUG, message, fields);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::INFO, message, &[]);
    }

    pub fn info_kv(&self, message: &str, fields: &[(&str, Value)]) {
        self.log(Level::INFO, message, fields);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, message, &[]);
    }

    pub fn warn_kv(&self, message: &str, fields: &[(&str, Value)]) {
        self.log(Level::WARN, message, fields);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::ERROR, message, &[]);
    }

    pub fn error_kv(&self, message: &str, fields: &[(&str, Value)]) {
        self.log(Level::ERROR, message, fields);
    }

    /// Emit one record. Records more verbose than the logger's configured
    /// level are dropped.
    pub fn log(&self, level: Level, message: &str, fields: &[(&str, Value)]) {
        if level > self.level {
            return;
        }
        let payload = Value::Object(self.payload(fields)).to_string();
        if level == Level::ERROR {
            tracing::error!(logger = %self.name, fields = %payload, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(logger = %self.name, fields = %payload, "{}", message);
        } else if level == Level::INFO {
            tracing::info!(logger = %self.name, fields = %payload, "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(logger = %self.name, fields = %payload, "{}", message);
        } else {
            tracing::trace!(logger = %self.name, fields = %payload, "{}", message);
        }
    }

    /// Build the structured payload for one record: logger name, current
    /// correlation id (if any), and the caller-supplied fields. The key
    /// `"message"` is reserved for the primary message and stripped from
    /// caller fields.
    pub fn payload(&self, fields: &[(&str, Value)]) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("logger".to_string(), Value::String(self.name.clone()));
        if let Some(id) = context::get_correlation_id() {
            payload.insert("correlation_id".to_string(), Value::String(id));
        }
        for (key, value) in fields {
            if *key == "message" {
                continue;
            }
            payload.insert((*key).to_string(), value.clone());
        }
        payload
    }
}

lazy_static! {
    // tracing::Level does not implement Hash, so the key carries its
    // string form.
    static ref LOGGER_CACHE: RwLock<HashMap<(String, String), Arc<Logger>>> =
        RwLock::new(HashMap::new());
}

/// Return the process-wide logger for `(name, level)`, constructing it at
/// most once per key. Cached lookups take only the read lock.
///
/// # Examples
///
/// ```rust
/// use tracing::Level;
///
/// let a = perch::get_cached_logger("api", Level::INFO);
/// let b = perch::get_cached_logger("api", Level::INFO);
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub fn get_cached_logger(name: &str, level: Level) -> Arc<Logger> {
    let key = (name.to_string(), level.to_string());

    if let Ok(cache) = LOGGER_CACHE.read() {
        if let Some(logger) = cache.get(&key) {
            return logger.clone();
        }
    }

    let mut cache = match LOGGER_CACHE.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache
        .entry(key)
        .or_insert_with(|| Arc::new(Logger::new(name, level)))
        .clone()
}

// Re-export the most commonly used tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};

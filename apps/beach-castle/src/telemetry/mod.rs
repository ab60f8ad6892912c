use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

fn env_truthy(var: &str) -> Option<bool> {
    std::env::var(var).map(|v| v != "0" && !v.is_empty()).ok()
}

static PERF_ENABLED: Lazy<bool> = Lazy::new(|| env_truthy("CASTLE_PERF").unwrap_or(false));

static STATS: Lazy<Mutex<HashMap<&'static str, PerfStat>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Stats are reported every this many samples while enabled.
const REPORT_EVERY: u64 = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerfStat {
    pub total_ns: u128,
    pub max_ns: u128,
    pub count: u64,
}

impl PerfStat {
    fn record(&mut self, duration: Duration) {
        let nanos = duration.as_nanos();
        self.count += 1;
        self.total_ns += nanos;
        if nanos > self.max_ns {
            self.max_ns = nanos;
        }
    }

    pub fn avg_ns(&self) -> u128 {
        if self.count > 0 {
            self.total_ns / self.count as u128
        } else {
            0
        }
    }
}

pub fn enabled() -> bool {
    *PERF_ENABLED
}

pub fn record_duration(label: &'static str, duration: Duration) {
    if !enabled() {
        return;
    }
    let mut stats = STATS.lock();
    let entry = stats.entry(label).or_default();
    entry.record(duration);
    if entry.count % REPORT_EVERY == 0 {
        report(label, entry);
    }
}

/// Writes every collected counter to the log. Called once on shutdown.
pub fn log_summary() {
    if !enabled() {
        return;
    }
    let stats = STATS.lock();
    let mut labels: Vec<_> = stats.keys().copied().collect();
    labels.sort_unstable();
    for label in labels {
        if let Some(stat) = stats.get(label) {
            report(label, stat);
        }
    }
}

fn report(label: &'static str, stat: &PerfStat) {
    let avg_us = stat.avg_ns() as f64 / 1_000.0;
    let max_us = stat.max_ns as f64 / 1_000.0;
    info!(
        target: "castle::perf",
        label,
        count = stat.count,
        avg_us = format_args!("{avg_us:.2}"),
        max_us = format_args!("{max_us:.2}"),
        "perf"
    );
}

pub struct PerfGuard {
    label: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(label: &'static str) -> Option<Self> {
        if !enabled() {
            return None;
        }
        Some(Self {
            label,
            start: Instant::now(),
        })
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        record_duration(self.label, self.start.elapsed());
    }
}

pub mod logging {
    use clap::ValueEnum;
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use tracing::level_filters::LevelFilter;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LogLevel {
        Error,
        #[default]
        Warn,
        Info,
        Debug,
        Trace,
    }

    impl LogLevel {
        pub fn as_str(self) -> &'static str {
            match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        }

        pub fn to_filter(self) -> LevelFilter {
            match self {
                LogLevel::Error => LevelFilter::ERROR,
                LogLevel::Warn => LevelFilter::WARN,
                LogLevel::Info => LevelFilter::INFO,
                LogLevel::Debug => LevelFilter::DEBUG,
                LogLevel::Trace => LevelFilter::TRACE,
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    pub struct LogConfig {
        pub level: LogLevel,
        pub file: Option<PathBuf>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum InitError {
        #[error("failed to open log file {path:?}: {source}")]
        Io {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("failed to configure logger: {0}")]
        Configure(String),
    }

    static INIT: OnceLock<()> = OnceLock::new();
    static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    /// Installs the global subscriber. Later calls are no-ops.
    pub fn init(config: &LogConfig) -> Result<(), InitError> {
        if INIT.get().is_some() {
            return Ok(());
        }

        inner_init(config)?;
        INIT.set(()).ok();
        Ok(())
    }

    fn inner_init(config: &LogConfig) -> Result<(), InitError> {
        let env_filter = build_env_filter(config.level.to_filter());

        // The terminal belongs to the UI, so without a file logs go nowhere.
        let (writer, guard) = match &config.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| InitError::Io {
                        path: path.clone(),
                        source,
                    })?;
                tracing_appender::non_blocking(file)
            }
            None => tracing_appender::non_blocking(std::io::sink()),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_level(true)
            .with_target(config.level >= LogLevel::Debug)
            .with_thread_names(config.level >= LogLevel::Debug)
            .with_ansi(false)
            .with_writer(writer)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| InitError::Configure(err.to_string()))?;

        let _ = GUARD.set(guard);
        Ok(())
    }

    fn build_env_filter(level: LevelFilter) -> EnvFilter {
        match std::env::var("CASTLE_LOG_FILTER") {
            Ok(filter) => EnvFilter::new(filter),
            Err(_) => EnvFilter::new(default_filter_for(level)),
        }
    }

    pub(crate) fn default_filter_for(level: LevelFilter) -> String {
        match level {
            LevelFilter::TRACE => "info,beach_castle=trace,castle=trace".to_owned(),
            LevelFilter::DEBUG => "info,beach_castle=debug,castle=debug".to_owned(),
            LevelFilter::INFO => "info".to_owned(),
            LevelFilter::WARN => "warn".to_owned(),
            LevelFilter::ERROR => "error".to_owned(),
            LevelFilter::OFF => "off".to_owned(),
        }
    }

}

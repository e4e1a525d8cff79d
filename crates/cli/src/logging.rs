use crate::config::LoggingConfig;
use engine::traits::{CapError, CapResult};
use engine::{LogControl, LogLevel};
use std::sync::RwLock;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Layer, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Swaps the live `EnvFilter` when the shell's `log` command runs.
pub struct ReloadLogControl {
    handle: FilterHandle,
    level: RwLock<LogLevel>,
}

impl LogControl for ReloadLogControl {
    fn set_level(&self, level: LogLevel) -> CapResult<()> {
        self.handle
            .reload(EnvFilter::new(level.as_str()))
            .map_err(|e| CapError::Other(format!("cannot change log level: {}", e)))?;
        if let Ok(mut current) = self.level.write() {
            *current = level;
        }
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.read().map(|l| *l).unwrap_or(LogLevel::Warn)
    }
}

/// Install the global subscriber. Output goes to stderr so stdout only
/// carries command results. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<ReloadLogControl> {
    let (filter, level) = match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            let level = level_from_hint(filter.max_level_hint(), config.level);
            (filter, level)
        }
        Err(_) => (EnvFilter::new(config.level.as_str()), config.level),
    };
    let (filter, handle) = reload::Layer::new(filter);

    // Use Layer::boxed() to unify the types of the branches
    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else if !config.show_time {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(ReloadLogControl {
        handle,
        level: RwLock::new(level),
    })
}

/// Collapse a filter's most verbose directive onto the shell's four levels.
/// `trace` reads as `debug` and `off` as `error`.
fn level_from_hint(hint: Option<LevelFilter>, fallback: LogLevel) -> LogLevel {
    let Some(hint) = hint else {
        return fallback;
    };
    match hint.into_level() {
        None => LogLevel::Error,
        Some(l) if l == Level::ERROR => LogLevel::Error,
        Some(l) if l == Level::WARN => LogLevel::Warn,
        Some(l) if l == Level::INFO => LogLevel::Info,
        Some(_) => LogLevel::Debug,
    }
}

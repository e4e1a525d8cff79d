use config::{Config, ConfigError, Environment, File};
use engine::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShellConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Per-command time limit; 0 disables it.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ShellConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            command_timeout_ms: default_command_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_prompt() -> String {
    "> ".to_string()
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: LogLevel,
    #[serde(default)]
    pub show_time: bool,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            show_time: false,
            json: false,
        }
    }
}

fn default_level() -> LogLevel {
    LogLevel::Warn
}

/// Layered config: `stated.yaml`, then `.stated.yaml` (local override), then
/// an explicit `STATED_CONFIG` file, then `STATED__*` environment variables.
pub fn load_config() -> Result<ShellConfig, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name("stated.yaml").required(false))
        .add_source(File::with_name(".stated.yaml").required(false));

    if let Ok(path) = std::env::var("STATED_CONFIG") {
        builder = builder.add_source(File::from(PathBuf::from(path)).required(true));
    }

    builder
        // Map nested env vars like STATED__LOGGING__LEVEL=debug
        .add_source(Environment::with_prefix("STATED").separator("__"))
        .build()?
        .try_deserialize()
}

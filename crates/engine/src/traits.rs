use crate::types::{LogLevel, ResultValue};
use std::path::Path;

/// Result type for capability operations.
pub type CapResult<T> = Result<T, CapError>;

#[derive(Debug, thiserror::Error)]
pub enum CapError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Engine facade
// ---------------------------------------------------------------------------

pub type EngineResult = Result<ResultValue, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no template loaded, run init first")]
    NotInitialized,

    #[error("json pointer not found: {0}")]
    PointerNotFound(String),

    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("cannot parse template: {0}")]
    Parse(String),

    #[error(transparent)]
    Capability(#[from] CapError),

    #[error("timed out after {0}ms")]
    Timeout(u64),
}

/// The template engine as seen by the shell: a set of named asynchronous
/// operations, each taking the raw text typed after the command name.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    /// Load (or replace) the template. `-f <file>`, `-x`/`--oneshot`, or an
    /// inline JSON template.
    async fn init(&self, args: &str) -> EngineResult;
    /// `<pointer> <json>` – write data and return the recomputed output.
    async fn set(&self, args: &str) -> EngineResult;
    /// The input template.
    async fn input(&self, args: &str) -> EngineResult;
    /// The computed output, optionally scoped to a pointer.
    async fn output(&self, args: &str) -> EngineResult;
    /// Internal evaluation state.
    async fn state(&self, args: &str) -> EngineResult;
    /// Dependents of a pointer.
    async fn from(&self, args: &str) -> EngineResult;
    /// Dependencies of a pointer.
    async fn to(&self, args: &str) -> EngineResult;
    /// Evaluation plan.
    async fn plan(&self, args: &str) -> EngineResult;
    /// Divider marker for documentation.
    async fn note(&self, args: &str) -> EngineResult;
    /// Set the diagnostic verbosity.
    async fn log(&self, args: &str) -> EngineResult;
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

pub trait FilesystemOps: Send + Sync {
    fn read_file(&self, path: &Path) -> CapResult<Vec<u8>>;
    fn exists(&self, path: &Path) -> bool;
}

// ---------------------------------------------------------------------------
// Log control
// ---------------------------------------------------------------------------

/// Runtime control over the host's diagnostic output.
pub trait LogControl: Send + Sync {
    fn set_level(&self, level: LogLevel) -> CapResult<()>;
    fn level(&self) -> LogLevel;
}

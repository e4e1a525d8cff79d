//! Engine context and shell session – explicit values instead of globals.

use crate::commands::CommandRegistry;
use crate::platform::{MemoryLogControl, StdFilesystem};
use crate::traits::*;
use std::sync::Arc;

/// Capabilities handed to the engine.
///
/// Holds trait objects so hosts (CLI, tests, embedders) can swap
/// implementations, e.g. a reloadable tracing filter vs an in-memory level.
pub struct EngineContext {
    fs: Box<dyn FilesystemOps>,
    log: Box<dyn LogControl>,
}

impl EngineContext {
    pub fn new(fs: Box<dyn FilesystemOps>, log: Box<dyn LogControl>) -> Self {
        Self { fs, log }
    }

    /// Real filesystem, log level kept in memory.
    pub fn default_platform() -> Self {
        Self {
            fs: Box::new(StdFilesystem),
            log: Box::new(MemoryLogControl::default()),
        }
    }

    pub fn fs(&self) -> &dyn FilesystemOps {
        self.fs.as_ref()
    }

    pub fn log(&self) -> &dyn LogControl {
        self.log.as_ref()
    }
}

/// One interactive session: the engine plus the command table bound to it.
///
/// Built once at startup and only read afterwards.
pub struct Session {
    engine: Arc<dyn Engine>,
    registry: CommandRegistry,
}

impl Session {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            registry: CommandRegistry::new(),
        }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

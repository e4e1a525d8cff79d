//! Default implementations of the capability traits.
//!
//! - [`StdFilesystem`]: real std::fs reads
//! - [`MemoryLogControl`]: remembers the level, changes nothing else

use crate::traits::*;
use crate::types::LogLevel;
use std::path::Path;
use std::sync::RwLock;

// ===========================================================================
// Filesystem – wraps std::fs
// ===========================================================================

pub struct StdFilesystem;

impl FilesystemOps for StdFilesystem {
    fn read_file(&self, path: &Path) -> CapResult<Vec<u8>> {
        match std::fs::read(path) {
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(
                CapError::PermissionDenied(format!("cannot read {}: {}", path.display(), e)),
            ),
            read => Ok(read?),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

// ===========================================================================
// Log control – in-memory only
// ===========================================================================

/// Used when the host has no reloadable subscriber (tests, embedding).
pub struct MemoryLogControl {
    level: RwLock<LogLevel>,
}

impl MemoryLogControl {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level: RwLock::new(level),
        }
    }
}

impl Default for MemoryLogControl {
    fn default() -> Self {
        Self::new(LogLevel::Warn)
    }
}

impl LogControl for MemoryLogControl {
    fn set_level(&self, level: LogLevel) -> CapResult<()> {
        let mut guard = self
            .level
            .write()
            .map_err(|_| CapError::Other("log level lock poisoned".into()))?;
        *guard = level;
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.read().map(|l| *l).unwrap_or(LogLevel::Warn)
    }
}

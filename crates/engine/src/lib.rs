//! Engine crate – everything the `stated` shell needs that is not the shell
//! loop itself.
//!
//! Holds the explicit result type, the JSON result serializer, the engine
//! facade trait with a built-in template engine, and the command registry.
//! Nothing here reads stdin or starts a loop, so the serializer and registry
//! can be embedded without side effects.

pub mod args;
pub mod commands;
pub mod context;
pub mod platform;
pub mod pointer;
pub mod processor;
pub mod serialize;
pub mod template;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use args::{InitArgs, ModeDecision};
pub use commands::{CommandDescriptor, CommandId, CommandRegistry};
pub use context::{EngineContext, Session};
pub use serialize::stringify;
pub use template::TemplateEngine;
pub use traits::{Engine, EngineError, EngineResult, LogControl};
pub use types::{LogLevel, ResultValue};

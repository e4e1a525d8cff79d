//! Command registry – the fixed table of shell commands.
//!
//! Every name maps to a [`CommandId`]; dispatch is a `match` on that id, so
//! there is no lookup by method name and no way to register a command the
//! engine cannot serve.

use crate::traits::{Engine, EngineResult};
use crate::types::ResultValue;
use std::io::Write;

/// Closed set of shell commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Init,
    Set,
    In,
    Out,
    State,
    From,
    To,
    Plan,
    Note,
    Log,
    Help,
}

impl CommandId {
    /// Local commands never reach the engine.
    pub fn is_local(&self) -> bool {
        matches!(self, CommandId::Help)
    }
}

/// Engine-backed commands, in listing order.
const ENGINE_COMMANDS: &[(CommandId, &str, &str)] = &[
    (CommandId::Init, "init", "-f <fname> to Initialize the template"),
    (CommandId::Set, "set", "Set data to a JSON pointer path and show the executed output"),
    (CommandId::In, "in", "Show the input template"),
    (CommandId::Out, "out", "[jsonPointer] Show the executed output"),
    (CommandId::State, "state", "Show the current state of the templateMeta"),
    (CommandId::From, "from", "Show the dependents of a given JSON pointer"),
    (CommandId::To, "to", "Show the dependencies of a given JSON pointer"),
    (CommandId::Plan, "plan", "Show the evaluation plan"),
    (CommandId::Note, "note", "returns ═══ ... for creating documentation"),
    (CommandId::Log, "log", "set the log level [debug, info, warn, error]"),
];

const LOCAL_COMMANDS: &[(CommandId, &str, &str)] = &[(
    CommandId::Help,
    "help",
    "Display available commands and their descriptions",
)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub id: CommandId,
    pub name: &'static str,
    pub help: &'static str,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    descriptors: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            descriptors: Vec::with_capacity(ENGINE_COMMANDS.len() + LOCAL_COMMANDS.len()),
        };
        for &(id, name, help) in ENGINE_COMMANDS.iter().chain(LOCAL_COMMANDS) {
            reg.register(CommandDescriptor { id, name, help });
        }
        reg
    }

    /// Add a descriptor. A repeated name replaces the earlier entry in place.
    fn register(&mut self, descriptor: CommandDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|d| d.name == descriptor.name)
        {
            Some(existing) => {
                tracing::warn!(name = descriptor.name, "command registered twice");
                *existing = descriptor;
            }
            None => self.descriptors.push(descriptor),
        }
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[CommandDescriptor] {
        &self.descriptors
    }

    pub fn list(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<&CommandDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Run an engine-backed command. Local commands answer with `Undefined`;
    /// the shell handles them itself.
    pub async fn invoke(&self, id: CommandId, engine: &dyn Engine, args: &str) -> EngineResult {
        tracing::debug!(command = ?id, args, "invoke");
        match id {
            CommandId::Init => engine.init(args).await,
            CommandId::Set => engine.set(args).await,
            CommandId::In => engine.input(args).await,
            CommandId::Out => engine.output(args).await,
            CommandId::State => engine.state(args).await,
            CommandId::From => engine.from(args).await,
            CommandId::To => engine.to(args).await,
            CommandId::Plan => engine.plan(args).await,
            CommandId::Note => engine.note(args).await,
            CommandId::Log => engine.log(args).await,
            CommandId::Help => Ok(ResultValue::Undefined),
        }
    }

    /// Write the help listing.
    pub fn write_help(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "Available commands:")?;
        for d in &self.descriptors {
            writeln!(out, "  .{} - {}", d.name, d.help)?;
        }
        Ok(())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineContext;
    use crate::template::TemplateEngine;
    use std::collections::HashSet;

    #[test]
    fn test_closed_command_set() {
        let reg = CommandRegistry::new();
        assert_eq!(
            reg.list(),
            vec!["init", "set", "in", "out", "state", "from", "to", "plan", "note", "log", "help"]
        );
        let unique: HashSet<&str> = reg.list().into_iter().collect();
        assert_eq!(unique.len(), reg.list().len());
        assert!(reg.descriptors().iter().all(|d| !d.help.is_empty()));
    }

    #[test]
    fn test_resolve() {
        let reg = CommandRegistry::new();
        assert_eq!(reg.resolve("out").unwrap().id, CommandId::Out);
        assert!(reg.resolve("help").unwrap().id.is_local());
        assert!(reg.resolve("quit").is_none());
    }

    #[test]
    fn test_repeated_name_replaces() {
        let mut reg = CommandRegistry::new();
        reg.register(CommandDescriptor {
            id: CommandId::Note,
            name: "note",
            help: "replacement",
        });
        assert_eq!(reg.list().len(), 11);
        assert_eq!(reg.resolve("note").unwrap().help, "replacement");
        assert_eq!(reg.list()[8], "note");
    }

    #[test]
    fn test_help_listing_in_order() {
        let reg = CommandRegistry::new();
        let mut buf = Vec::new();
        reg.write_help(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Available commands:");
        assert_eq!(lines[1], "  .init - -f <fname> to Initialize the template");
        assert_eq!(
            lines.last().unwrap(),
            &"  .help - Display available commands and their descriptions"
        );
        assert_eq!(lines.len(), 12);
    }

    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_help_listing_surfaces_write_errors() {
        let reg = CommandRegistry::new();
        let err = reg.write_help(&mut ClosedSink).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_invoke_routes_to_engine() {
        let reg = CommandRegistry::new();
        let engine = TemplateEngine::new(EngineContext::default_platform());
        reg.invoke(CommandId::Init, &engine, r#"{"a": 1, "b": "${ /a }"}"#)
            .await
            .unwrap();
        let out = reg.invoke(CommandId::Out, &engine, "/b").await.unwrap();
        assert_eq!(out, ResultValue::from(serde_json::json!(1)));
        let note = reg.invoke(CommandId::Note, &engine, "").await.unwrap();
        assert_eq!(note, ResultValue::string("═══ ... ═══"));
    }
}

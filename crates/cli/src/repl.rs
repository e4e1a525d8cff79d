//! Interactive loop – one command at a time, failures never end the session.

use engine::{stringify, CommandId, EngineError, Session};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub struct Dispatcher<'a> {
    session: &'a Session,
    prompt: String,
    timeout: Option<Duration>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(session: &'a Session, prompt: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            session,
            prompt: prompt.into(),
            timeout,
        }
    }

    /// Read lines until EOF. Only I/O errors on the streams end the loop.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        self.display_prompt(&mut writer).await?;
        while let Some(line) = lines.next_line().await? {
            self.handle_line(&line, &mut writer).await?;
            self.display_prompt(&mut writer).await?;
        }
        writer.flush().await
    }

    async fn display_prompt<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.prompt.as_bytes()).await?;
        writer.flush().await
    }

    async fn handle_line<W: AsyncWrite + Unpin>(
        &self,
        line: &str,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let Some((name, args)) = split_command(line) else {
            return Ok(());
        };
        let Some(descriptor) = self.session.registry().resolve(name) else {
            let msg = format!(
                "Invalid command: {}. Type help for a list of commands\n",
                name
            );
            return writer.write_all(msg.as_bytes()).await;
        };

        if descriptor.id.is_local() {
            self.help(writer).await
        } else {
            self.execute(descriptor.id, args, writer).await
        }
    }

    async fn execute<W: AsyncWrite + Unpin>(
        &self,
        id: CommandId,
        args: &str,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let invocation = self
            .session
            .registry()
            .invoke(id, self.session.engine(), args);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .unwrap_or_else(|_| Err(EngineError::Timeout(limit.as_millis() as u64))),
            None => invocation.await,
        };

        match result {
            Ok(value) => {
                let mut text = stringify(&value);
                text.push('\n');
                writer.write_all(text.as_bytes()).await
            }
            Err(e) => {
                tracing::warn!(command = ?id, error = %e, "command failed");
                writer
                    .write_all(format!("error: {}\n", e).as_bytes())
                    .await
            }
        }
    }

    async fn help<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut listing = Vec::new();
        let rendered = self
            .session
            .registry()
            .write_help(&mut listing)
            .map(|()| listing);
        report_help(rendered, writer).await
    }
}

/// Print a rendered help listing, or the error that stopped rendering it.
async fn report_help<W: AsyncWrite + Unpin>(
    rendered: std::io::Result<Vec<u8>>,
    writer: &mut W,
) -> std::io::Result<()> {
    match rendered {
        Ok(listing) => writer.write_all(&listing).await,
        Err(e) => {
            tracing::warn!(error = %e, "help listing failed");
            writer
                .write_all(format!("error: {}\n", e).as_bytes())
                .await
        }
    }
}

/// Split `name rest` (or `.name rest`) into the command name and its raw
/// argument text. `None` for blank lines.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let line = line.strip_prefix('.').unwrap_or(line);
    Some(match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::traits::{Engine, EngineResult};
    use engine::{EngineContext, ResultValue, TemplateEngine};
    use std::sync::{Arc, Mutex};

    /// Records every call; `out /missing` fails, `plan` never finishes.
    #[derive(Default)]
    struct ScriptedEngine {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedEngine {
        fn record(&self, op: &str, args: &str) -> EngineResult {
            self.calls
                .lock()
                .unwrap()
                .push((op.to_string(), args.to_string()));
            Ok(ResultValue::object([("op", ResultValue::string(op))]))
        }
    }

    #[async_trait::async_trait]
    impl Engine for ScriptedEngine {
        async fn init(&self, args: &str) -> EngineResult {
            self.record("init", args)
        }
        async fn set(&self, args: &str) -> EngineResult {
            self.record("set", args)
        }
        async fn input(&self, args: &str) -> EngineResult {
            self.record("in", args)
        }
        async fn output(&self, args: &str) -> EngineResult {
            if args == "/missing" {
                return Err(EngineError::PointerNotFound(args.to_string()));
            }
            self.record("out", args)
        }
        async fn state(&self, args: &str) -> EngineResult {
            self.record("state", args)
        }
        async fn from(&self, args: &str) -> EngineResult {
            self.record("from", args)
        }
        async fn to(&self, args: &str) -> EngineResult {
            self.record("to", args)
        }
        async fn plan(&self, _args: &str) -> EngineResult {
            std::future::pending().await
        }
        async fn note(&self, args: &str) -> EngineResult {
            self.record("note", args)
        }
        async fn log(&self, args: &str) -> EngineResult {
            self.record("log", args)
        }
    }

    async fn transcript(session: &Session, input: &str, timeout: Option<Duration>) -> String {
        let mut out: Vec<u8> = Vec::new();
        Dispatcher::new(session, "> ", timeout)
            .run(input.as_bytes(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("out /a/b"), Some(("out", "/a/b")));
        assert_eq!(split_command("  .state  "), Some(("state", "")));
        assert_eq!(
            split_command("set /a {\"x\": 1}"),
            Some(("set", "/a {\"x\": 1}"))
        );
        assert_eq!(split_command("   "), None);
    }

    #[tokio::test]
    async fn test_out_forwards_args_and_prints_json() {
        let engine = Arc::new(ScriptedEngine::default());
        let session = Session::new(engine.clone());
        let text = transcript(&session, "out /a/b\n", None).await;
        assert_eq!(text, "> {\n  \"op\": \"out\"\n}\n> ");
        assert_eq!(
            engine.calls.lock().unwrap().as_slice(),
            &[("out".to_string(), "/a/b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_session_alive() {
        let engine = Arc::new(ScriptedEngine::default());
        let session = Session::new(engine.clone());
        let text = transcript(&session, "out /missing\nstate\n", None).await;
        assert_eq!(
            text,
            "> error: json pointer not found: /missing\n> {\n  \"op\": \"state\"\n}\n> "
        );
        assert_eq!(engine.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_loop_continues() {
        let session = Session::new(Arc::new(ScriptedEngine::default()));
        let text = transcript(&session, "plan\nnote\n", Some(Duration::from_millis(20))).await;
        assert!(text.contains("error: timed out after 20ms\n"));
        assert!(text.ends_with("{\n  \"op\": \"note\"\n}\n> "));
    }

    #[tokio::test]
    async fn test_unknown_and_blank_lines() {
        let session = Session::new(Arc::new(ScriptedEngine::default()));
        let text = transcript(&session, "\nfrobnicate 1\n", None).await;
        assert_eq!(
            text,
            "> > Invalid command: frobnicate. Type help for a list of commands\n> "
        );
    }

    #[tokio::test]
    async fn test_help_lists_every_command() {
        let session = Session::new(Arc::new(ScriptedEngine::default()));
        let text = transcript(&session, ".help\n", None).await;
        assert!(text.starts_with("> Available commands:\n"));
        for name in session.registry().list() {
            assert!(text.contains(&format!("  .{} - ", name)), "missing {name}");
        }
        assert!(text.ends_with("> "));
    }

    #[tokio::test]
    async fn test_help_render_error_is_reported() {
        let mut out: Vec<u8> = Vec::new();
        let failed = Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "listing sink closed",
        ));
        report_help(failed, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "error: listing sink closed\n");
    }

    #[tokio::test]
    async fn test_template_engine_session() {
        let engine = Arc::new(TemplateEngine::new(EngineContext::default_platform()));
        let session = Session::new(engine);
        let input = "out\ninit {\"a\": 1, \"b\": \"${ /a }\"}\nset /a 5\nout /b\nfrom /a\n";
        let text = transcript(&session, input, None).await;
        assert!(text.contains("error: no template loaded, run init first\n"));
        assert!(text.contains("> 5\n> [\n  \"/b\"\n]\n> "));
    }
}

//! Startup protocol – pick the mode, initialize once, then print the oneshot
//! result or hand over to the interactive loop.

use crate::config::ShellConfig;
use crate::repl::Dispatcher;
use anyhow::Context;
use engine::{stringify, Engine, EngineError, ModeDecision, Session};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

pub async fn start<R, W>(
    raw_args: &str,
    engine: Arc<dyn Engine>,
    config: &ShellConfig,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let decision = ModeDecision::from_args(raw_args);
    tracing::debug!(oneshot = decision.oneshot, args = %decision.remaining_args, "mode selected");

    // Not caught: an engine that failed to initialize has nothing to serve.
    let init = engine.init(&decision.remaining_args);
    let result = match config.command_timeout() {
        Some(limit) => tokio::time::timeout(limit, init)
            .await
            .unwrap_or_else(|_| Err(EngineError::Timeout(limit.as_millis() as u64))),
        None => init.await,
    }
    .context("initialization failed")?;

    if decision.oneshot {
        let mut text = stringify(&result);
        text.push('\n');
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        return Ok(());
    }

    let session = Session::new(engine);
    tracing::info!(commands = session.registry().list().len(), "interactive session started");
    Dispatcher::new(&session, config.prompt.clone(), config.command_timeout())
        .run(reader, writer)
        .await
        .context("interactive session i/o failed")
}

//! `stated` – interactive shell and one-shot front end for the template engine.
//!
//! `stated -f template.json -x` prints the computed output once and exits.
//! Without `-x` the template is loaded and a `> ` prompt accepts commands
//! (`help` lists them) until stdin closes.

mod config;
mod logging;
mod repl;
mod shell;

use anyhow::Context;
use engine::platform::StdFilesystem;
use engine::{args::join_args, EngineContext, TemplateEngine};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::Instrument;

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_cli(std::env::args().skip(1)).await
}

/// Run as the top-level program: load config, set up logging, then start
/// the shell on stdin/stdout.
pub async fn run_cli<I>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = String>,
{
    let config = config::load_config().context("cannot load stated configuration")?;
    let log_control = logging::init_logging(&config.logging)?;

    let raw_args = join_args(args);
    let ctx = EngineContext::new(Box::new(StdFilesystem), Box::new(log_control));
    let engine = Arc::new(TemplateEngine::new(ctx));

    let session_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("session", %session_id);

    shell::start(
        &raw_args,
        engine,
        &config,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .instrument(span)
    .await
}

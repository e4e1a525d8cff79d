//! Built-in engine backed by [`TemplateProcessor`].

use crate::args::InitArgs;
use crate::context::EngineContext;
use crate::pointer;
use crate::processor::TemplateProcessor;
use crate::traits::*;
use crate::types::{LogLevel, ResultValue};
use serde_json::Value;
use std::path::Path;
use tokio::sync::RwLock;

pub const NOTE_MARKER: &str = "═══ ... ═══";

pub struct TemplateEngine {
    ctx: EngineContext,
    processor: RwLock<Option<TemplateProcessor>>,
}

impl TemplateEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            processor: RwLock::new(None),
        }
    }

    fn load_template(&self, args: &InitArgs) -> Result<Value, EngineError> {
        if let Some(path) = &args.file {
            if !self.ctx.fs().exists(path) {
                return Err(EngineError::InvalidInput(format!(
                    "template file not found: {}",
                    path.display()
                )));
            }
            let bytes = self.ctx.fs().read_file(path)?;
            return parse_template_file(path, &bytes);
        }
        match args.inline_template() {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| EngineError::Parse(format!("inline template: {}", e))),
            None => Err(EngineError::InvalidInput(
                "nothing to load, use -f <file> or pass a JSON template".into(),
            )),
        }
    }

    /// Run `f` against the loaded processor.
    async fn with_processor<T>(
        &self,
        f: impl FnOnce(&TemplateProcessor) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let guard = self.processor.read().await;
        let tp = guard.as_ref().ok_or(EngineError::NotInitialized)?;
        f(tp)
    }
}

fn parse_template_file(path: &Path, bytes: &[u8]) -> Result<Value, EngineError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_slice(bytes)
            .map_err(|e| EngineError::Parse(format!("{}: {}", path.display(), e)))
    } else {
        serde_json::from_slice(bytes)
            .map_err(|e| EngineError::Parse(format!("{}: {}", path.display(), e)))
    }
}

fn required_pointer(args: &str, command: &str) -> Result<String, EngineError> {
    let ptr = args.trim();
    if ptr.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{} needs a json pointer, e.g. {} /a/b",
            command, command
        )));
    }
    pointer::normalize(ptr)
}

#[async_trait::async_trait]
impl Engine for TemplateEngine {
    async fn init(&self, args: &str) -> EngineResult {
        let parsed = InitArgs::parse_str(args)?;
        let template = self.load_template(&parsed)?;
        let tp = TemplateProcessor::new(template)?;
        let result = if parsed.oneshot {
            ResultValue::from(tp.output())
        } else {
            ResultValue::from(tp.input())
        };
        *self.processor.write().await = Some(tp);
        tracing::info!(file = ?parsed.file, oneshot = parsed.oneshot, "template loaded");
        Ok(result)
    }

    async fn set(&self, args: &str) -> EngineResult {
        let args = args.trim();
        let (ptr, data) = args.split_once(char::is_whitespace).ok_or_else(|| {
            EngineError::InvalidInput("usage: set <jsonPointer> <json data>".into())
        })?;
        let data: Value = serde_json::from_str(data.trim())
            .map_err(|e| EngineError::InvalidInput(format!("data is not JSON: {}", e)))?;

        let mut guard = self.processor.write().await;
        let tp = guard.as_mut().ok_or(EngineError::NotInitialized)?;
        tp.set_data(ptr, data)?;
        Ok(ResultValue::from(tp.output()))
    }

    async fn input(&self, _args: &str) -> EngineResult {
        self.with_processor(|tp| Ok(ResultValue::from(tp.input())))
            .await
    }

    async fn output(&self, args: &str) -> EngineResult {
        let ptr = args.trim().to_string();
        self.with_processor(move |tp| {
            if ptr.is_empty() {
                return Ok(ResultValue::from(tp.output()));
            }
            pointer::get(tp.output(), &ptr)?
                .map(ResultValue::from)
                .ok_or(EngineError::PointerNotFound(ptr.clone()))
        })
        .await
    }

    async fn state(&self, _args: &str) -> EngineResult {
        self.with_processor(|tp| Ok(tp.meta())).await
    }

    async fn from(&self, args: &str) -> EngineResult {
        let ptr = required_pointer(args, "from")?;
        self.with_processor(|tp| Ok(ResultValue::string_array(tp.from(&ptr)?)))
            .await
    }

    async fn to(&self, args: &str) -> EngineResult {
        let ptr = required_pointer(args, "to")?;
        self.with_processor(|tp| Ok(ResultValue::string_array(tp.to(&ptr)?)))
            .await
    }

    async fn plan(&self, _args: &str) -> EngineResult {
        self.with_processor(|tp| Ok(ResultValue::string_array(tp.plan())))
            .await
    }

    async fn note(&self, args: &str) -> EngineResult {
        let text = args.trim();
        if text.is_empty() {
            Ok(ResultValue::string(NOTE_MARKER))
        } else {
            Ok(ResultValue::string(format!("═══ {} ═══", text)))
        }
    }

    async fn log(&self, args: &str) -> EngineResult {
        let level: LogLevel = args.parse().map_err(EngineError::InvalidInput)?;
        self.ctx.log().set_level(level)?;
        tracing::info!(%level, "log level changed");
        Ok(ResultValue::object([(
            "log level",
            ResultValue::string(level.as_str()),
        )]))
    }
}

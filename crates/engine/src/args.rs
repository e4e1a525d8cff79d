//! Init argument text – mode selection and template source parsing.
//!
//! The shell hands over the raw command line re-joined with single spaces.
//! Leading tokens are flags; everything from the first non-flag token on is
//! an inline template, kept byte for byte apart from trailing oneshot flags.
//! Mode selection and `init` share that split, so they always agree on
//! whether the run is oneshot.

use crate::traits::EngineError;
use clap::Parser;
use std::path::PathBuf;

const ONESHOT_FLAGS: [&str; 2] = ["-x", "--oneshot"];
const FILE_FLAGS: [&str; 2] = ["-f", "--file"];

/// Whether to run one command and exit, plus the text to forward to init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDecision {
    pub oneshot: bool,
    pub remaining_args: String,
}

impl ModeDecision {
    /// Look for the oneshot flag. Interactive by default, never fails.
    pub fn from_args(raw: &str) -> Self {
        let split = split_raw(raw);
        Self {
            oneshot: split.trailing_oneshot
                || split.flags.iter().any(|t| ONESHOT_FLAGS.contains(t)),
            remaining_args: raw.to_string(),
        }
    }
}

/// Re-join process arguments the way the shell expects them.
pub fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Raw text split
// ---------------------------------------------------------------------------

struct RawSplit<'a> {
    flags: Vec<&'a str>,
    inline: Option<&'a str>,
    trailing_oneshot: bool,
}

/// Whitespace-separated tokens with their byte offsets.
fn tokens(raw: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in raw.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &raw[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &raw[s..]));
    }
    out
}

fn split_raw(raw: &str) -> RawSplit<'_> {
    let toks = tokens(raw);
    let mut flags = Vec::new();
    let mut inline = None;
    let mut i = 0;
    while i < toks.len() {
        let (offset, tok) = toks[i];
        if !tok.starts_with('-') {
            inline = Some(&raw[offset..]);
            break;
        }
        flags.push(tok);
        if FILE_FLAGS.contains(&tok) {
            if let Some(&(_, value)) = toks.get(i + 1) {
                flags.push(value);
                i += 1;
            }
        }
        i += 1;
    }

    let mut trailing_oneshot = false;
    if let Some(mut text) = inline {
        while let Some(rest) = ONESHOT_FLAGS.iter().find_map(|f| strip_last_token(text, f)) {
            trailing_oneshot = true;
            text = rest;
        }
        inline = Some(text.trim_end()).filter(|t| !t.is_empty());
    }

    RawSplit {
        flags,
        inline,
        trailing_oneshot,
    }
}

/// `text` without a final whitespace-separated `token`.
fn strip_last_token<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let trimmed = text.trim_end();
    let rest = trimmed.strip_suffix(token)?;
    (rest.is_empty() || rest.ends_with(char::is_whitespace)).then_some(rest)
}

// ---------------------------------------------------------------------------
// init arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "init", no_binary_name = true, disable_help_flag = true)]
struct InitFlags {
    /// Template file (.json, .yaml or .yml).
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print the computed output once and exit.
    #[arg(short = 'x', long = "oneshot")]
    oneshot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
    pub file: Option<PathBuf>,
    pub oneshot: bool,
    /// Inline JSON template, used when no file is given.
    pub template: Option<String>,
}

impl InitArgs {
    pub fn parse_str(raw: &str) -> Result<Self, EngineError> {
        let split = split_raw(raw);
        let flags = InitFlags::try_parse_from(split.flags.iter().copied())
            .map_err(|e| EngineError::InvalidInput(first_line(&e.to_string())))?;
        if let (Some(_), Some(text)) = (&flags.file, split.inline) {
            return Err(EngineError::InvalidInput(format!(
                "unexpected text after -f: {}",
                text
            )));
        }
        Ok(Self {
            file: flags.file,
            oneshot: flags.oneshot || split.trailing_oneshot,
            template: split.inline.map(str::to_string),
        })
    }

    pub fn inline_template(&self) -> Option<String> {
        self.template.clone()
    }
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or_default().to_string()
}

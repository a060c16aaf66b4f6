//! `{{ env.VAR }}` placeholder expansion over raw config text
//!
//! Runs before TOML parsing so secrets such as the Bedrock token can stay out
//! of the file. Comment lines are copied verbatim.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Placeholder expansion failure, with the 1-based config line it occurred on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// Variable unset and no `default(..)` given
    #[error("line {line}: environment variable not found: `{var}`")]
    Missing { line: usize, var: String },
    /// Placeholder not scoped under `env.`
    #[error("line {line}: only variables scoped with 'env.' are supported: `{key}`")]
    UnsupportedScope { line: usize, key: String },
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 1: dotted key, 2: optional default("...") value
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand every placeholder in `input`
///
/// `{{ env.VAR | default("x") }}` falls back to `x` when `VAR` is unset.
/// Line structure, including a trailing newline, is preserved.
///
/// # Errors
///
/// Fails on the first unset variable without a default, or on a
/// placeholder outside the `env.` scope
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let mut output = String::with_capacity(input.len());

    for (index, line) in input.lines().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
        } else {
            expand_line(line, index + 1, &mut output)?;
        }
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str, number: usize, output: &mut String) -> Result<(), ExpandError> {
    let mut last_end = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        output.push_str(&line[last_end..whole.start()]);
        output.push_str(&resolve(&captures, number)?);
        last_end = whole.end();
    }

    output.push_str(&line[last_end..]);
    Ok(())
}

fn resolve(captures: &Captures<'_>, line: usize) -> Result<String, ExpandError> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(var) = key.strip_prefix("env.").filter(|var| !var.is_empty() && !var.contains('.')) else {
        return Err(ExpandError::UnsupportedScope {
            line,
            key: key.to_owned(),
        });
    };

    match (std::env::var(var), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(ExpandError::Missing {
            line,
            var: var.to_owned(),
        }),
    }
}

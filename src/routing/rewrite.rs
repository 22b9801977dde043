//! Outbound path rewriting.
//!
//! # Responsibilities
//! - Expand `{name}` placeholders in a rewrite template from captured values
//! - Extract placeholder names for construction-time validation
//!
//! # Design Decisions
//! - Pure string transform: no I/O, no randomness, deterministic
//! - An unbound placeholder at request time means a rule slipped past
//!   construction-time validation; callers treat it as an internal error

use std::collections::HashMap;

use thiserror::Error;

/// Error raised while expanding a rewrite template.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("template references `{{{0}}}` with no captured value")]
    UnboundCapture(String),

    #[error("unterminated `{{` in template")]
    UnterminatedPlaceholder,
}

/// Extract placeholder names from a template, in order of appearance.
///
/// Used at rule-compilation time to cross-check templates against the
/// pattern's capture-group names.
pub fn placeholders(template: &str) -> Result<Vec<&str>, RewriteError> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or(RewriteError::UnterminatedPlaceholder)?;
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    Ok(names)
}

/// Substitute every `{name}` placeholder with its captured value.
///
/// The result always carries a leading `/` and contains no unresolved
/// placeholders.
pub fn expand(template: &str, captures: &HashMap<String, String>) -> Result<String, RewriteError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or(RewriteError::UnterminatedPlaceholder)?;
        let name = &after[..end];
        let value = captures
            .get(name)
            .ok_or_else(|| RewriteError::UnboundCapture(name.to_string()))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    Ok(out)
}

//! Rule compilation.
//!
//! # Responsibilities
//! - Compile a configured path pattern into an anchored regex
//! - Parse and validate the upstream base URI
//! - Cross-check rewrite template placeholders against capture groups
//!
//! # Design Decisions
//! - Patterns compile at construction; a `Rule` cannot exist with a bad
//!   pattern, so matching never fails at request time
//! - Upstream is scheme + authority only; a path component in the upstream
//!   is a configuration bug and is rejected

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, Scheme};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::RuleConfig;
use crate::routing::rewrite::{self, RewriteError};

/// Error raised while compiling rules. Fatal at startup.
#[derive(Debug, Error)]
pub enum InvalidRuleError {
    #[error("rule `{name}`: invalid path pattern `{pattern}`: {source}")]
    Pattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule `{name}`: invalid rewrite template: {source}")]
    Template {
        name: String,
        #[source]
        source: RewriteError,
    },

    #[error("rule `{name}`: rewrite template references `{{{placeholder}}}` which the pattern does not capture")]
    UnboundPlaceholder { name: String, placeholder: String },

    #[error("rule `{name}`: invalid upstream `{upstream}`: {reason}")]
    Upstream {
        name: String,
        upstream: String,
        reason: String,
    },

    #[error("duplicate path pattern `{pattern}` (rules `{first}` and `{second}`)")]
    DuplicatePattern {
        pattern: String,
        first: String,
        second: String,
    },
}

/// A validated upstream base: scheme + host + port, no path component.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub scheme: Scheme,
    pub authority: Authority,
}

impl Upstream {
    /// Parse and validate an upstream URI from configuration.
    pub fn parse(rule_name: &str, raw: &str) -> Result<Self, InvalidRuleError> {
        let invalid = |reason: String| InvalidRuleError::Upstream {
            name: rule_name.to_string(),
            upstream: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme `{other}`"))),
        }
        if !matches!(url.path(), "" | "/") {
            return Err(invalid("must not contain a path component".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not contain a query or fragment".to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let scheme = Scheme::from_str(url.scheme()).map_err(|e| invalid(e.to_string()))?;
        let authority = Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { scheme, authority })
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// A single path-match-and-rewrite-and-forward specification.
///
/// Immutable after compilation. Matching is anchored: the pattern must
/// cover the entire request path.
#[derive(Debug)]
pub struct Rule {
    /// Identifier surfaced in logs and metrics.
    pub name: String,
    /// Outbound path template with `{name}` placeholders.
    pub template: String,
    /// Base URI the request is forwarded to.
    pub upstream: Upstream,

    /// Anchored matcher over the full request path.
    pattern: Regex,
    /// Pattern as written in config, for duplicate detection.
    pattern_source: String,
}

impl Rule {
    /// Compile a rule from its configuration entry.
    ///
    /// All request-time failure modes are ruled out here: the pattern must
    /// compile, every template placeholder must name a capture group, and
    /// the upstream must be a bare scheme + authority.
    pub fn compile(config: &RuleConfig) -> Result<Self, InvalidRuleError> {
        let anchored = anchor(&config.path);
        let pattern = Regex::new(&anchored).map_err(|source| InvalidRuleError::Pattern {
            name: config.name.clone(),
            pattern: config.path.clone(),
            source,
        })?;

        let group_names: Vec<&str> = pattern.capture_names().flatten().collect();
        let placeholders =
            rewrite::placeholders(&config.rewrite).map_err(|source| InvalidRuleError::Template {
                name: config.name.clone(),
                source,
            })?;
        for placeholder in placeholders {
            if !group_names.contains(&placeholder) {
                return Err(InvalidRuleError::UnboundPlaceholder {
                    name: config.name.clone(),
                    placeholder: placeholder.to_string(),
                });
            }
        }

        let upstream = Upstream::parse(&config.name, &config.upstream)?;

        Ok(Self {
            name: config.name.clone(),
            template: config.rewrite.clone(),
            upstream,
            pattern,
            pattern_source: config.path.clone(),
        })
    }

    /// Match the full request path, returning named captures on success.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.pattern.captures(path)?;
        let mut named = HashMap::new();
        for name in self.pattern.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                named.insert(name.to_string(), m.as_str().to_string());
            }
        }
        Some(named)
    }

    /// Pattern text as written in configuration.
    pub fn pattern_source(&self) -> &str {
        &self.pattern_source
    }
}

/// Wrap a pattern in `^...$` unless the author anchored it already.
fn anchor(pattern: &str) -> String {
    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }
    anchored
}

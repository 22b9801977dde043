//! Rule lookup.
//!
//! # Responsibilities
//! - Hold the ordered, compiled rule list
//! - Resolve an incoming path to the first matching rule
//! - Reject ambiguous (duplicate) patterns at construction
//!
//! # Design Decisions
//! - Immutable after construction (safe for unlimited concurrent readers)
//! - First match wins, in declaration order
//! - Explicit `None` on no match rather than a silent default rule

use std::collections::HashMap;

use crate::config::RuleConfig;
use crate::routing::rule::{InvalidRuleError, Rule};

/// Result of resolving a request path against the table.
///
/// Borrows the matched rule; the table outlives all in-flight requests.
#[derive(Debug)]
pub struct MatchResult<'a> {
    pub rule: &'a Rule,
    /// Capture-group name → captured substring. Empty if the pattern has
    /// no named groups.
    pub captures: HashMap<String, String>,
}

/// Ordered, immutable collection of rules.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Compile all configured rules into a table.
    ///
    /// Fails on the first malformed rule or on a textually duplicated
    /// pattern; a duplicate would silently shadow its successor.
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, InvalidRuleError> {
        let mut rules: Vec<Rule> = Vec::with_capacity(configs.len());
        for config in configs {
            let rule = Rule::compile(config)?;
            if let Some(existing) = rules
                .iter()
                .find(|r| r.pattern_source() == rule.pattern_source())
            {
                return Err(InvalidRuleError::DuplicatePattern {
                    pattern: rule.pattern_source().to_string(),
                    first: existing.name.clone(),
                    second: rule.name.clone(),
                });
            }
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// Resolve a request path to the first matching rule, in declaration
    /// order. `None` means no rule matched; callers map this to 404.
    pub fn resolve(&self, path: &str) -> Option<MatchResult<'_>> {
        self.rules.iter().find_map(|rule| {
            rule.matches(path)
                .map(|captures| MatchResult { rule, captures })
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered scan, first match wins)
//!     → rule.rs (anchored regex match, named captures)
//!     → rewrite.rs (placeholder expansion)
//!     → Return: outbound path + upstream, or no match
//!
//! Rule Compilation (at startup):
//!     RuleConfig[]
//!     → Compile anchored regexes
//!     → Cross-check rewrite templates against capture groups
//!     → Reject duplicate patterns
//!     → Freeze as immutable RuleTable
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Declaration order is match order (first match wins)
//! - Matching is anchored to the whole path, never a substring
//! - Deterministic: the same path always resolves to the same rule
//! - Linear scan over the rule list; replaceable with a radix matcher
//!   behind the same `resolve` contract if rule counts ever grow

pub mod rewrite;
pub mod rule;
pub mod table;

pub use rule::{InvalidRuleError, Rule, Upstream};
pub use table::{MatchResult, RuleTable};

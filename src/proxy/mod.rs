//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Matched rule + rewritten path + inbound request
//!     → headers.rs (strip hop-by-hop headers)
//!     → forwarder.rs (build outbound request, pooled dispatch)
//!     → upstream response
//!     → headers.rs (strip hop-by-hop headers again)
//!     → Relay to client, body streamed
//! ```
//!
//! # Design Decisions
//! - One shared pooled client for all upstreams, keyed by scheme+authority
//! - Bodies are streamed in both directions, never buffered
//! - No automatic retries; retry policy belongs to a surrounding layer

pub mod forwarder;
pub mod headers;

pub use forwarder::{ForwardError, Forwarder};

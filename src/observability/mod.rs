//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, request-id correlated)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; request ID flows through all events
//! - Metrics are cheap (atomic increments behind the metrics facade)
//! - Per-request exposure: matched rule (or "none"), status, latency

pub mod logging;
pub mod metrics;

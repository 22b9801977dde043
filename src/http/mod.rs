//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, wildcard gateway handler)
//!     → request.rs (assign request ID)
//!     → routing layer resolves rule, rewrite computes outbound path
//!     → proxy layer forwards and relays the response
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;

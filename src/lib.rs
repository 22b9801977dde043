//! Request-routing gateway core.
//!
//! A path-based rule matcher and forwarding engine: incoming request
//! paths are matched against an ordered rule table, rewritten through
//! capture-group templates, and proxied to the configured upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Upstream dispatch.
//!
//! # Responsibilities
//! - Build the outbound request: inbound method, filtered headers, body stream
//! - Send through the shared pooled client
//! - Enforce the connect timeout and the total per-request deadline
//! - Relay status, headers and body without buffering
//!
//! # Design Decisions
//! - Connect failures map to 502, deadline expiry to 504; the distinction
//!   matters to operators diagnosing a dead backend vs. a slow one
//! - Dropping the returned future (client disconnect) drops the in-flight
//!   upstream call; hyper tears the borrowed pool connection down with it
//! - No retries here: idempotency and retry budgets are policy for a
//!   surrounding layer

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::proxy::headers::strip_hop_by_hop;
use crate::routing::rule::Upstream;

/// Error raised while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connect failure or connection reset. Maps to 502.
    #[error("upstream unavailable: {0}")]
    Unavailable(#[from] hyper_util::client::legacy::Error),

    /// Total per-request deadline exceeded. Maps to 504.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The outbound request could not be built. Unreachable for compiled
    /// rules; maps to 500.
    #[error("invalid outbound request: {0}")]
    Invalid(String),
}

/// Dispatches rewritten requests to upstream services over a shared
/// connection pool.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl Forwarder {
    /// Build a forwarder with the configured timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Forward the inbound request to `upstream` under `path_and_query`.
    ///
    /// The inbound body is streamed to the upstream and the upstream body
    /// is streamed back; memory stays bounded for arbitrarily large
    /// payloads.
    pub async fn forward(
        &self,
        upstream: &Upstream,
        path_and_query: &str,
        inbound: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = inbound.into_parts();
        let mut headers = parts.headers;

        let pq: PathAndQuery = path_and_query
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ForwardError::Invalid(e.to_string()))?;
        let mut uri_parts = axum::http::uri::Parts::default();
        uri_parts.scheme = Some(upstream.scheme.clone());
        uri_parts.authority = Some(upstream.authority.clone());
        uri_parts.path_and_query = Some(pq);
        let uri = Uri::from_parts(uri_parts).map_err(|e| ForwardError::Invalid(e.to_string()))?;

        strip_hop_by_hop(&mut headers);
        // The outbound Host derives from the upstream authority, not the
        // inbound request.
        headers.remove(header::HOST);

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|e| ForwardError::Invalid(e.to_string()))?;
        *outbound.headers_mut() = headers;

        let response: Response<hyper::body::Incoming> =
            match tokio::time::timeout(self.request_timeout, self.client.request(outbound)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(ForwardError::Unavailable(err)),
                Err(_) => return Err(ForwardError::Timeout(self.request_timeout)),
            };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

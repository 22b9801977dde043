//! HTTP server setup and request pipeline.
//!
//! # Responsibilities
//! - Create the Axum Router with the wildcard gateway handler
//! - Wire up middleware (tracing, request IDs)
//! - Resolve rule → rewrite path → forward, with failure mapping
//! - Expose liveness/readiness endpoints
//! - Record per-request observability (matched rule, status, latency)

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::http::request::{RequestIdExt, RequestIdLayer};
use crate::observability::metrics;
use crate::proxy::forwarder::{ForwardError, Forwarder};
use crate::routing::rewrite;
use crate::routing::rule::InvalidRuleError;
use crate::routing::table::RuleTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RuleTable>,
    pub forwarder: Forwarder,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new server from validated configuration.
    ///
    /// Compiles the rule table; a rule that does not compile is fatal and
    /// must keep the process from binding its listener.
    pub fn new(config: &GatewayConfig) -> Result<Self, InvalidRuleError> {
        let table = Arc::new(RuleTable::from_config(&config.rules)?);
        let forwarder = Forwarder::new(&config.timeouts);

        tracing::info!(rules = table.len(), "Routing table compiled");

        let state = AppState { table, forwarder };
        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health/live", get(health))
            .route("/health/ready", get(health))
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "message": "OK" }))
}

/// Main gateway handler.
/// Resolves a rule, rewrites the path, and forwards the request.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_owned);

    // 1. Resolve the rule.
    let Some(matched) = state.table.resolve(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No rule matched");
        metrics::record_request(&method, 404, "none", start);
        return (StatusCode::NOT_FOUND, "no matching rule").into_response();
    };
    let rule_name = matched.rule.name.clone();

    // 2. Rewrite the path. Placeholders are validated when the table is
    // built, so a failure here is an internal invariant violation.
    let outbound_path = match rewrite::expand(&matched.rule.template, &matched.captures) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                rule = %rule_name,
                error = %err,
                "Rewrite failed on a compiled rule"
            );
            metrics::record_request(&method, 500, &rule_name, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "rewrite failed").into_response();
        }
    };

    // The inbound query string travels with the rewritten path.
    let path_and_query = match &query {
        Some(q) => format!("{outbound_path}?{q}"),
        None => outbound_path,
    };

    tracing::debug!(
        request_id = %request_id,
        rule = %rule_name,
        outbound = %path_and_query,
        upstream = %matched.rule.upstream,
        "Forwarding request"
    );

    // 3. Forward and relay.
    match state
        .forwarder
        .forward(&matched.rule.upstream, &path_and_query, request)
        .await
    {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), &rule_name, start);
            tracing::debug!(
                request_id = %request_id,
                rule = %rule_name,
                status = %status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
            response
        }
        Err(err @ ForwardError::Timeout(_)) => {
            tracing::warn!(request_id = %request_id, rule = %rule_name, error = %err, "Upstream timed out");
            metrics::record_request(&method, 504, &rule_name, start);
            (StatusCode::GATEWAY_TIMEOUT, "upstream timeout").into_response()
        }
        Err(err @ ForwardError::Unavailable(_)) => {
            tracing::warn!(request_id = %request_id, rule = %rule_name, error = %err, "Upstream unavailable");
            metrics::record_request(&method, 502, &rule_name, start);
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }
        Err(err) => {
            tracing::error!(request_id = %request_id, rule = %rule_name, error = %err, "Forwarding failed");
            metrics::record_request(&method, 500, &rule_name, start);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

//! Hop-by-hop header filtering.
//!
//! Hop-by-hop headers are meaningful only for a single transport
//! connection and must not be forwarded across the proxy, in either
//! direction (RFC 9110 §7.6.1).

use axum::http::{HeaderMap, HeaderName};

/// True for headers that must not cross the proxy.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "transfer-encoding"
            | "upgrade"
            | "te"
            | "trailer"
    )
}

/// Remove hop-by-hop headers in place.
///
/// Applied to the inbound request before forwarding and to the upstream
/// response before relaying.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let doomed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_hop_by_hop(name))
        .cloned()
        .collect();
    for name in doomed {
        headers.remove(name);
    }
}

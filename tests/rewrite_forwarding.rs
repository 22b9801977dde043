//! End-to-end rewrite and forwarding tests against mock backends.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use route_gateway::config::{GatewayConfig, RuleConfig};
use route_gateway::http::HttpServer;
use route_gateway::lifecycle::Shutdown;

fn rule(name: &str, path: &str, rewrite: &str, upstream: &str) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        path: path.to_string(),
        rewrite: rewrite.to_string(),
        upstream: upstream.to_string(),
    }
}

async fn spawn_gateway(config: GatewayConfig, addr: SocketAddr) -> Shutdown {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config).expect("rules should compile");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_static_path_rewrite() {
    let backend_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "created").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.rules.push(rule(
        "create",
        "/create",
        "/api/v0/workloads.create",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/create"))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "created");

    let req = seen.recv().await.expect("backend should see the request");
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/api/v0/workloads.create");

    shutdown.trigger();
}

#[tokio::test]
async fn test_body_forwarded_unchanged() {
    let backend_addr: SocketAddr = "127.0.0.1:29183".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29184".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "invoked").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.rules.push(rule(
        "invoke",
        "/invoke",
        "/api/v0/instances.create",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .post(format!("http://{proxy_addr}/invoke"))
        .header("content-type", "application/json")
        .body(r#"{"x":1}"#)
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);

    let req = seen.recv().await.expect("backend should see the request");
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/v0/instances.create");
    assert_eq!(req.body, r#"{"x":1}"#);
    assert_eq!(req.header("content-type"), Some("application/json"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_capture_group_rewrite() {
    let backend_addr: SocketAddr = "127.0.0.1:29185".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29186".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "ok").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.rules.push(rule(
        "invoke-fn",
        "/invoke/(?<function>[^/]+)",
        "/api/v0/functions/{function}/invoke",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/invoke/hello-world"))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);

    let req = seen.recv().await.expect("backend should see the request");
    assert_eq!(req.path, "/api/v0/functions/hello-world/invoke");

    shutdown.trigger();
}

#[tokio::test]
async fn test_header_filtering_and_request_id() {
    let backend_addr: SocketAddr = "127.0.0.1:29187".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29188".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "ok").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.rules.push(rule(
        "create",
        "/create",
        "/api/v0/workloads.create",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/create"))
        .header("trailer", "expires")
        .header("x-custom", "survives")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);

    let req = seen.recv().await.expect("backend should see the request");
    // Hop-by-hop headers do not cross the gateway.
    assert_eq!(req.header("trailer"), None);
    // End-to-end headers do.
    assert_eq!(req.header("x-custom"), Some("survives"));
    // The gateway assigns a request ID and forwards it upstream.
    assert!(req.header("x-request-id").is_some());
    // The outbound Host names the upstream, not the gateway.
    assert_eq!(req.header("host"), Some(backend_addr.to_string().as_str()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_caller_request_id_preserved() {
    let backend_addr: SocketAddr = "127.0.0.1:29189".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29190".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "ok").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.rules.push(rule(
        "create",
        "/create",
        "/api/v0/workloads.create",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    client()
        .get(format!("http://{proxy_addr}/create"))
        .header("x-request-id", "caller-supplied-id")
        .send()
        .await
        .expect("gateway unreachable");

    let req = seen.recv().await.expect("backend should see the request");
    assert_eq!(req.header("x-request-id"), Some("caller-supplied-id"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_first_match_wins_and_query_passthrough() {
    let backend_addr: SocketAddr = "127.0.0.1:29191".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29192".parse().unwrap();

    let mut seen = common::start_recording_backend(backend_addr, "ok").await;

    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    // Both patterns match /api/list; the first declared rule wins.
    config.rules.push(rule(
        "broad",
        "/api/(?<rest>.*)",
        "/v0/{rest}",
        &format!("http://{backend_addr}"),
    ));
    config.rules.push(rule(
        "narrow",
        "/api/list",
        "/v0/special-list",
        &format!("http://{backend_addr}"),
    ));

    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/api/list?limit=5"))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);

    let req = seen.recv().await.expect("backend should see the request");
    assert_eq!(req.path, "/v0/list?limit=5");

    shutdown.trigger();
}

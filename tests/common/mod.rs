//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as observed by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    /// Full request target, query string included.
    pub path: String,
    /// Lowercased header names with their values.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SeenRequest {
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

async fn read_request(socket: TcpStream) -> Option<(SeenRequest, TcpStream)> {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await.ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await.ok()?;
    }

    let seen = SeenRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    Some((seen, reader.into_inner()))
}

async fn write_response(socket: &mut TcpStream, status_line: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a mock backend that records every request it receives and
/// answers 200 with a fixed body.
pub async fn start_recording_backend(
    addr: SocketAddr,
    response: &'static str,
) -> mpsc::UnboundedReceiver<SeenRequest> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some((seen, mut socket)) = read_request(socket).await {
                            let _ = tx.send(seen);
                            write_response(&mut socket, "200 OK", response).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    rx
}

/// Start a backend that reads the request, then stalls for `delay` before
/// answering. For timeout tests.
#[allow(dead_code)]
pub async fn start_slow_backend(addr: SocketAddr, delay: Duration) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        if let Some((_, mut socket)) = read_request(socket).await {
                            tokio::time::sleep(delay).await;
                            write_response(&mut socket, "200 OK", "late").await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

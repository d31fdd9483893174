//! Throwaway HTTP/1.1 server for exercising the real clients in tests.
//!
//! Requests are captured raw and answered by the first route whose prefix
//! matches the request line; unmatched requests get a 404.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned reply for requests whose request line starts with `prefix`.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    /// e.g. `"GET /integration/file-list"`; empty matches everything.
    pub prefix: &'static str,
    /// e.g. `"200 OK"`
    pub status: &'static str,
    pub body: &'static str,
}

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Answer every request with `status` and `body`.
    pub async fn respond(status: &'static str, body: &'static str) -> std::io::Result<Self> {
        Self::routes(vec![Route {
            prefix: "",
            status,
            body,
        }])
        .await
    }

    pub async fn routes(routes: Vec<Route>) -> std::io::Result<Self> {
        Self::spawn(Some(routes)).await
    }

    /// Accept connections and read requests, but never answer.
    pub async fn silent() -> std::io::Result<Self> {
        Self::spawn(None).await
    }

    async fn spawn(routes: Option<Vec<Route>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);
        let routes = routes.map(Arc::new);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, Arc::clone(&captured), routes.clone()));
            }
        });

        Ok(Self { addr, requests })
    }

    /// Base URL with a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    captured: Arc<Mutex<Vec<String>>>,
    routes: Option<Arc<Vec<Route>>>,
) {
    let raw = match read_request(&mut stream).await {
        Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
        Err(_) => return,
    };
    if let Ok(mut requests) = captured.lock() {
        requests.push(raw.clone());
    }

    let Some(routes) = routes else {
        tokio::time::sleep(Duration::from_secs(300)).await;
        return;
    };

    let (status, body) = routes
        .iter()
        .find(|r| raw.starts_with(r.prefix))
        .map(|r| (r.status, r.body))
        .unwrap_or(("404 Not Found", "no route"));
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(head_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let body_len = buf.len() - (head_end + 4);

        if let Some(len) = content_length(&head) {
            if body_len >= len {
                return Ok(buf);
            }
        } else if head.contains("transfer-encoding: chunked") {
            if buf.ends_with(b"0\r\n\r\n") {
                return Ok(buf);
            }
        } else {
            return Ok(buf);
        }
    }
}

fn content_length(head: &str) -> Option<usize> {
    head.lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

//! Shared fixtures for unit tests: settings builders and a one-shot HTTP responder.

use crate::config::{CompletionSettings, RetrievalSettings, Settings, StoreSettings};
use reqwest::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub fn completion_settings(base: &str) -> CompletionSettings {
    CompletionSettings {
        api_key: "sk-test".to_string(),
        base_url: format!("{base}/v1"),
        model: "deepseek-chat".to_string(),
        temperature: 0.3,
        timeout: Duration::from_secs(60),
    }
}

pub fn store_settings(url: &str) -> StoreSettings {
    StoreSettings {
        url: url.to_string(),
        api_key: "anon".to_string(),
        table: "market_news".to_string(),
        source_label: "NexusPulse HQ".to_string(),
        store_metrics: false,
    }
}

pub fn settings() -> Settings {
    Settings {
        retrieval: RetrievalSettings::default(),
        completion: completion_settings("http://unused"),
        store: store_settings("http://unused"),
    }
}

/// Client that never routes loopback test traffic through a proxy.
pub fn test_http() -> Client {
    Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("test client builds")
}

/// One request as the responder saw it.
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line, e.g. `POST /v1/chat/completions HTTP/1.1`.
    pub head: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Accepts a single connection, records the request and answers with a fixed response.
pub struct OneShotServer {
    addr: SocketAddr,
    handle: JoinHandle<CapturedRequest>,
}

impl OneShotServer {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            let _ = socket.shutdown().await;
            request
        });

        Self { addr, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn request(self) -> CapturedRequest {
        self.handle.await.expect("responder task")
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head_text.split("\r\n");
    let head = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use payment_verifier::config::{NetworkConfig, VerifierConfig};

/// A successful `gettxinfo` body.
#[allow(dead_code)]
pub fn confirmed_body(block_number: u64, confirmations: u64) -> String {
    format!(
        r#"{{"status":"1","message":"OK","result":{{"hash":"0xabc","blockNumber":"{block_number}","confirmations":"{confirmations}","success":true,"gasUsed":"21000","from":"0x1111","to":"0x2222","value":"1000"}}}}"#
    )
}

/// A body for a transaction the explorer has not indexed yet.
#[allow(dead_code)]
pub fn pending_body() -> String {
    r#"{"status":"0","message":"Transaction not found","result":null}"#.to_string()
}

/// A body for a reverted transaction.
#[allow(dead_code)]
pub fn reverted_body(reason: &str) -> String {
    format!(
        r#"{{"status":"1","message":"OK","result":{{"hash":"0xabc","blockNumber":"77","success":false,"revertReason":"{reason}"}}}}"#
    )
}

/// Start a programmable mock explorer on an ephemeral port.
///
/// `f` receives the request line (e.g. `GET /api?module=... HTTP/1.1`) and
/// returns the status code and JSON body to answer with.
pub async fn start_mock_explorer<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request_head(&mut socket).await;
                        let request_line = request.lines().next().unwrap_or_default().to_string();
                        let (status, body) = f(request_line).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read until the end of the request headers; explorer queries carry no body.
async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// A config with one network pointing at the mock explorer and a fast schedule.
#[allow(dead_code)]
pub fn fast_config(explorer: SocketAddr, max_attempts: u32) -> VerifierConfig {
    let mut config = VerifierConfig::default();
    config.networks.clear();
    config.networks.insert(
        "testnet".to_string(),
        NetworkConfig::new(format!("http://{explorer}/api")),
    );
    config.polling.settle_delay_ms = 10;
    config.polling.poll_interval_ms = 20;
    config.polling.max_attempts = Some(max_attempts);
    config.polling.attempt_timeout_ms = 2_000;
    config.explorer.request_timeout_ms = 1_000;
    config.observability.metrics_enabled = false;
    config
}

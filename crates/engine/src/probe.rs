//! Target reachability check run before a suite starts

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

/// Wait until the application under test answers HTTP requests
///
/// Any response counts, including errors: the point is that something is
/// listening and serving, not that a particular page is healthy.
pub async fn wait_until_reachable(base_url: &str, timeout_duration: Duration) -> EngineResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) => {
                if resp.status().is_server_error() {
                    warn!("Target answered {} - continuing anyway", resp.status());
                }
                info!("Target is reachable at {}", base_url);
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to answer...", base_url);
                }
                // Connection refused is expected while the target is starting
                if !e.is_connect() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout_duration {
            break;
        }
        sleep(Duration::from_millis(200)).await;
    }

    Err(EngineError::TargetUnreachable {
        url: base_url.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unused_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|a| a.port())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_target() {
        crate::test_support::init_tracing();
        let url = format!("http://127.0.0.1:{}/", unused_port());
        let err = wait_until_reachable(&url, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TargetUnreachable { attempts, .. } if attempts >= 1));
    }

    #[tokio::test]
    async fn test_reachable_target() {
        crate::test_support::init_tracing();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                    .await;
            }
        });

        let url = format!("http://127.0.0.1:{}/", port);
        wait_until_reachable(&url, Duration::from_secs(5)).await.unwrap();
    }
}

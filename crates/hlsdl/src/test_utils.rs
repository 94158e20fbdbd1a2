//! Shared helpers for unit tests: tracing setup and a loopback HTTP stub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(INFO)` - uses specified level
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        $crate::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

#[derive(Debug, Clone)]
enum Delivery {
    /// Whole body in one write.
    Immediate,
    /// One byte per interval.
    Trickle(Duration),
    /// Advertise `content_length`, send the body, then go silent.
    Stall { content_length: usize },
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    body: Vec<u8>,
    delivery: Delivery,
}

impl StubResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delivery: Delivery::Immediate,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delivery: Delivery::Immediate,
        }
    }

    pub fn trickle(body: impl Into<Vec<u8>>, interval: Duration) -> Self {
        Self {
            delivery: Delivery::Trickle(interval),
            ..Self::ok(body)
        }
    }

    pub fn stall(partial_body: impl Into<Vec<u8>>, content_length: usize) -> Self {
        Self {
            delivery: Delivery::Stall { content_length },
            ..Self::ok(partial_body)
        }
    }
}

pub struct StubServer {
    addr: SocketAddr,
    /// Number of connections accepted so far.
    pub hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }
}

/// Serves `responses` in order, one per connection; the last one repeats.
/// Every response closes its connection so each request is counted.
pub async fn spawn_stub_server(responses: Vec<StubResponse>) -> StubServer {
    assert!(!responses.is_empty());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let response = responses[n.min(responses.len() - 1)].clone();

            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => {
                            request.extend_from_slice(&buf[..read]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let content_length = match response.delivery {
                    Delivery::Stall { content_length } => content_length,
                    _ => response.body.len(),
                };
                let head = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                    response.status, content_length
                );
                let _ = socket.write_all(head.as_bytes()).await;
                match response.delivery {
                    Delivery::Immediate => {
                        let _ = socket.write_all(&response.body).await;
                    }
                    Delivery::Trickle(interval) => {
                        for byte in &response.body {
                            tokio::time::sleep(interval).await;
                            let _ = socket.write_all(&[*byte]).await;
                            let _ = socket.flush().await;
                        }
                    }
                    Delivery::Stall { .. } => {
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    StubServer { addr, hits }
}

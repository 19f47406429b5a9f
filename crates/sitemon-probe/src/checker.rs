//! HTTP probe implementation.
//!
//! Issues one GET per service with the service's fetch timeout applied
//! to both the connection and the whole request, following redirects.
//! On failure the probe sleeps the configured post-failure wait before
//! reporting, throttling the next round; the sleep runs concurrently
//! with sibling probes, never against them.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{error, info};

use sitemon_config::ServiceSpec;

use crate::failure::{FailureKind, FailureRecord};

/// Seam the orchestrator fans out over. `None` means healthy.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, service: &ServiceSpec) -> Option<FailureRecord>;
}

/// Production probe backed by reqwest.
#[derive(Debug, Default)]
pub struct HttpProber;

impl HttpProber {
    pub fn new() -> Self {
        Self
    }

    /// The GET itself, without skip handling or the post-failure wait.
    async fn fetch(&self, service: &ServiceSpec) -> Option<FailureRecord> {
        let started = Instant::now();

        let headers = match extra_headers(&service.headers) {
            Ok(headers) => headers,
            Err(message) => {
                return Some(FailureRecord {
                    service: service.clone(),
                    kind: FailureKind::Unexpected(message),
                    duration: started.elapsed(),
                    status: None,
                });
            }
        };

        let client = match reqwest::Client::builder()
            .connect_timeout(service.fetch_timeout)
            .timeout(service.fetch_timeout)
            .user_agent(concat!("sitemon/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                return Some(FailureRecord {
                    service: service.clone(),
                    kind: FailureKind::Unexpected(format!("cannot build http client: {e}")),
                    duration: started.elapsed(),
                    status: None,
                });
            }
        };

        match client.get(&service.url).send().await {
            Ok(response) => {
                let duration = started.elapsed();
                let status = response.status().as_u16();
                // Strictly 2xx counts as healthy.
                if (200..=299).contains(&status) {
                    info!(
                        service = %service.name,
                        duration_ms = duration.as_millis() as u64,
                        "okay"
                    );
                    None
                } else {
                    Some(FailureRecord {
                        service: service.clone(),
                        kind: FailureKind::Status(status),
                        duration,
                        status: Some(status),
                    })
                }
            }
            Err(e) => {
                let duration = started.elapsed();
                let kind = if e.is_connect() || e.is_timeout() || e.is_request() {
                    FailureKind::Connection
                } else {
                    FailureKind::Unexpected(e.to_string())
                };
                Some(FailureRecord {
                    service: service.clone(),
                    kind,
                    duration,
                    status: None,
                })
            }
        }
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn check(&self, service: &ServiceSpec) -> Option<FailureRecord> {
        if !service.check {
            info!(service = %service.name, "skipping check");
            return None;
        }
        info!(service = %service.name, url = %service.url, "checking");

        let failure = self.fetch(service).await?;
        error!(service = %service.name, "{}", failure.message());

        // Give the service a moment before the failure drives another
        // round of probing.
        if !service.wait.is_zero() {
            tokio::time::sleep(service.wait).await;
        }
        Some(failure)
    }
}

/// Parse "Name: value" strings into a header map.
fn extra_headers(raw: &[String]) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("malformed header (expected 'Name: value'): {line}"))?;
        let name = HeaderName::try_from(name.trim())
            .map_err(|e| format!("bad header name in '{line}': {e}"))?;
        let value = HeaderValue::try_from(value.trim())
            .map_err(|e| format!("bad header value in '{line}': {e}"))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn spec(url: &str) -> ServiceSpec {
        ServiceSpec {
            name: "web".to_string(),
            url: url.to_string(),
            check: true,
            after: Vec::new(),
            attempts: 2,
            restarts: Vec::new(),
            scripts: Vec::new(),
            emails: Vec::new(),
            headers: Vec::new(),
            exec_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
            wait: Duration::ZERO,
        }
    }

    /// One-shot HTTP server: accepts a single connection, reads the
    /// request, writes a canned status line, closes.
    async fn one_shot_server(status_line: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn healthy_service_yields_nothing() {
        let url = one_shot_server("204 No Content").await;
        let outcome = HttpProber::new().check(&spec(&url)).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn bad_status_is_classified_with_its_code() {
        let url = one_shot_server("500 Internal Server Error").await;
        let failure = HttpProber::new().check(&spec(&url)).await.unwrap();
        assert_eq!(failure.kind, FailureKind::Status(500));
        assert_eq!(failure.status, Some(500));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_failure() {
        // Port 1 is never listening.
        let failure = HttpProber::new()
            .check(&spec("http://127.0.0.1:1/"))
            .await
            .unwrap();
        assert_eq!(failure.kind, FailureKind::Connection);
        assert!(failure.status.is_none());
    }

    #[tokio::test]
    async fn disabled_check_is_treated_as_healthy() {
        let mut service = spec("http://127.0.0.1:1/");
        service.check = false;
        assert!(HttpProber::new().check(&service).await.is_none());
    }

    #[tokio::test]
    async fn malformed_header_is_an_unexpected_failure() {
        let mut service = spec("http://127.0.0.1:1/");
        service.headers = vec!["no-colon-here".to_string()];
        let failure = HttpProber::new().check(&service).await.unwrap();
        assert!(matches!(failure.kind, FailureKind::Unexpected(_)));
    }

    #[tokio::test]
    async fn post_failure_wait_delays_the_report() {
        let mut service = spec("http://127.0.0.1:1/");
        service.wait = Duration::from_millis(150);
        let started = std::time::Instant::now();
        let failure = HttpProber::new().check(&service).await.unwrap();
        assert_eq!(failure.kind, FailureKind::Connection);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}

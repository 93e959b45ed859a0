//! In-process HTTP backend
//!
//! Fetches pages directly with an HTTP client instead of driving a browser,
//! so no process is launched. Every navigation is captured as a
//! [`Response`] that script expressions can evaluate.
//!
//! Of the launch options only certificate acceptance and the proxy apply.
//! Headless mode and profile paths have no meaning here and are ignored.

use async_trait::async_trait;
use replay_core::Response;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::client::{AutomationClient, Backend, LaunchOptions, SharedClient};
use crate::error::{ClientError, ClientResult};

/// Backend producing in-process HTTP clients
#[derive(Debug, Default)]
pub struct HttpBackend;

impl HttpBackend {
    /// Registered name
    pub const NAME: &'static str = "Http";

    pub fn new() -> Self {
        Self
    }

    /// Build a client from launch options
    pub fn connect(&self, options: &LaunchOptions) -> ClientResult<HttpClient> {
        let accept_invalid_certs = options.capabilities.accept_insecure_certs;
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(accept_invalid_certs);

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(reqwest::Proxy::all(format!("http://{}", proxy))?);
        }
        if options.profile_path.is_some() {
            debug!("Http backend ignores profile path");
        }

        let http = builder.build()?;
        info!(proxy = ?options.proxy, accept_invalid_certs, "Created in-process HTTP client");

        Ok(HttpClient {
            http,
            accept_invalid_certs,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn launch(&self, options: LaunchOptions) -> ClientResult<SharedClient> {
        Ok(Arc::new(self.connect(&options)?))
    }
}

/// Live in-process HTTP client
#[derive(Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    accept_invalid_certs: bool,
    closed: AtomicBool,
}

impl HttpClient {
    /// Whether certificate validation is disabled
    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }
}

#[async_trait]
impl AutomationClient for HttpClient {
    fn backend(&self) -> &str {
        HttpBackend::NAME
    }

    async fn navigate(&self, url: &str) -> ClientResult<Option<Response>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }

        let started = Instant::now();
        let response = self.http.get(url).send().await?;

        let status = response.status();
        let mut headers = format!("{:?} {}\r\n", response.version(), status);
        for (name, value) in response.headers() {
            headers.push_str(name.as_str());
            headers.push_str(": ");
            headers.push_str(&String::from_utf8_lossy(value.as_bytes()));
            headers.push_str("\r\n");
        }
        let final_url = response.url().to_string();
        let body = response.text().await?;
        let elapsed = started.elapsed().as_millis() as u64;

        debug!(url, status = status.as_u16(), elapsed_ms = elapsed, "Fetched page");

        Ok(Some(Response {
            url: final_url,
            status_code: status.as_u16(),
            headers,
            body,
            response_time_ms: elapsed,
        }))
    }

    async fn close(&self) -> ClientResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed in-process HTTP client");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;

    #[tokio::test]
    async fn test_launch_without_network() {
        let backend = HttpBackend::new();
        let mut options = LaunchOptions::new(Capabilities::new());
        options.proxy = Some("127.0.0.1:8080".to_string());
        options.profile_path = Some("/ignored".into());

        let client = backend.launch(options).await.unwrap();
        assert_eq!(client.backend(), "Http");
    }

    #[test]
    fn test_certificate_checks_on_by_override() {
        let backend = HttpBackend::new();
        assert!(backend.connect(&LaunchOptions::default()).unwrap().accepts_invalid_certs());

        let mut capabilities = Capabilities::new();
        capabilities.apply_overrides("acceptInsecureCerts=false").unwrap();
        let client = backend.connect(&LaunchOptions::new(capabilities)).unwrap();
        assert!(!client.accepts_invalid_certs());
    }

    #[tokio::test]
    async fn test_closed_client_refuses_navigation() {
        let client = HttpBackend::new()
            .launch(LaunchOptions::default())
            .await
            .unwrap();

        client.close().await.unwrap();
        client.close().await.unwrap();

        assert!(matches!(
            client.navigate("http://example.com/").await,
            Err(ClientError::Closed)
        ));
    }
}

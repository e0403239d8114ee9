//! HTTP client for prompt documents and image downloads
//!
//! Features:
//! - HTTP/2 with HTTP/1.1 fallback
//! - TLS 1.3 via rustls
//! - Brotli, Gzip, Deflate compression (auto-negotiated)
//! - Connection pooling with keep-alive

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

use crate::error::{GenerationError, Result};
use crate::provider::{FetchedDocument, Fetcher};

const USER_AGENT: &str = concat!("vidmaker/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP GET client
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION
            // ═══════════════════════════════════════════════════════════════
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            // ═══════════════════════════════════════════════════════════════
            // COMPRESSION (auto-negotiated via Accept-Encoding)
            // ═══════════════════════════════════════════════════════════════
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .user_agent(USER_AGENT)
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            // Generated images can be several megabytes
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| GenerationError::Fetch {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<Response> {
        debug!("Fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, &e))?;

        info!(
            status = %response.status(),
            version = ?response.version(),
            content_type = ?response.headers().get(CONTENT_TYPE),
            "Response received"
        );

        response.error_for_status().map_err(|e| fetch_error(url, &e))
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let response = self.get(url).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response.bytes().await.map_err(|e| fetch_error(url, &e))?;

        Ok(FetchedDocument {
            bytes,
            content_type,
        })
    }
}

fn fetch_error(url: &str, e: &reqwest::Error) -> GenerationError {
    GenerationError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    }
}

// src/sender.rs
use crate::config::ScanOptions;
use crate::error::ScanError;
use crate::response::CapturedResponse;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Transport seam between the request model and the network. Detectors only
/// ever see [`CapturedResponse`] values, so tests can substitute any server.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<CapturedResponse, ScanError>;
}

/// reqwest-backed sender. One client is built per scan and shared by every
/// request copy through an `Arc`.
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    pub fn new(options: &ScanOptions) -> Result<Self, ScanError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
            .timeout(Duration::from_secs(options.timeout_secs))
            // Connection reuse would let the server skip TCP/TLS setup on
            // later probes and skew the timing baseline.
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(options.allow_insecure_certificates);

        if let Some(proxy) = options.proxy() {
            info!("using proxy {}", proxy);
            builder = builder.proxy(
                reqwest::Proxy::all(&proxy)
                    .map_err(|e| ScanError::Config(format!("proxy not set correctly: {}", e)))?,
            );
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl RequestSender for HttpSender {
    async fn send(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<CapturedResponse, ScanError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| ScanError::Parse(format!("invalid method: {}", e)))?;

        let mut request = self.client.request(method, url.clone());
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if !body.is_empty() {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(CapturedResponse {
            url: final_url,
            body,
            headers: response_headers,
            status,
        })
    }
}

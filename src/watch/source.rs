//! Public IP lookup sources.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// IP lookup failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("lookup endpoint returned HTTP {0}")]
    Http(u16),
    #[error("lookup request failed: {0}")]
    Network(String),
    #[error("unparseable address in response: {0:?}")]
    Parse(String),
    #[error("all lookup endpoints failed")]
    Exhausted,
}

/// Something that can report the current public IP address.
#[async_trait]
pub trait IpSource: Send + Sync {
    async fn fetch(&self) -> Result<IpAddr, SourceError>;
}

/// Parse a plain-text lookup response body into an address.
pub(crate) fn parse_address(body: &str) -> Result<IpAddr, SourceError> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|_| SourceError::Parse(trimmed.to_string()))
}

/// HTTP source: one GET per endpoint, plain-text address in the body.
///
/// Endpoints are tried in configuration order; the first parseable answer
/// wins.
pub struct HttpIpSource {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl HttpIpSource {
    pub fn new(primary: &str, fallbacks: &[String], timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut urls = Vec::with_capacity(1 + fallbacks.len());
        urls.push(primary.to_string());
        urls.extend(fallbacks.iter().cloned());
        Self { client, urls }
    }

    async fn fetch_one(&self, url: &str) -> Result<IpAddr, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Http(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        parse_address(&body)
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<IpAddr, SourceError> {
        for url in &self.urls {
            match self.fetch_one(url).await {
                Ok(address) => return Ok(address),
                Err(err) => {
                    tracing::warn!(url, error = %err, "IP lookup endpoint failed");
                }
            }
        }
        Err(SourceError::Exhausted)
    }
}

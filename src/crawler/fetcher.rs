//! HTTP fetch capability
//!
//! The crawl core consumes fetching as an opaque capability: give it a URL,
//! get back a status code and body, or a transport error. [`HttpFetcher`]
//! is the reqwest-backed default; tests substitute their own [`Fetcher`].
//!
//! Any HTTP status is a successful fetch from the transport's point of
//! view; only connection-level failures are errors. There is no retry and
//! no timeout beyond the client's own.

use crate::config::RequestConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Result of a fetch: the response status and the full body.
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Errors from the fetch capability
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid proxy url: {0}")]
    InvalidProxy(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The URL the failed request targeted, when there was one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Sends one GET request and returns the response status and body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Builds the HTTP client used by [`HttpFetcher`]: custom user agent,
/// conservative timeouts, compressed transfer, optional proxy, and any
/// extra headers from the configuration.
pub fn build_http_client(config: &RequestConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(value.clone()))?;
        headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .default_headers(headers);

    if let Some(proxy) = &config.proxy {
        let proxy =
            reqwest::Proxy::all(proxy).map_err(|_| FetchError::InvalidProxy(proxy.clone()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(FetchError::Client)
}

/// Default [`Fetcher`] backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
    basic_auth: Option<(String, String)>,
}

impl HttpFetcher {
    pub fn new(config: &RequestConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            basic_auth: config
                .basic_auth
                .as_ref()
                .map(|auth| (auth.username.clone(), auth.password.clone())),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);

        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let config = RequestConfig::default();
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_invalid_extra_header_rejected() {
        let mut config = RequestConfig::default();
        config
            .headers
            .insert("bad header name".to_string(), "v".to_string());
        assert!(matches!(
            build_http_client(&config).unwrap_err(),
            FetchError::InvalidHeader(_)
        ));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let mut config = RequestConfig::default();
        config.proxy = Some("::nope::".to_string());
        assert!(matches!(
            build_http_client(&config).unwrap_err(),
            FetchError::InvalidProxy(_)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_carries_url() {
        // Nothing listens on port 1; the connect fails at the transport level.
        let fetcher = HttpFetcher::new(&RequestConfig::default()).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert_eq!(err.url(), Some("http://127.0.0.1:1/"));
    }
}

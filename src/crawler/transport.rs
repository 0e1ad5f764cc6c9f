//! HTTP transport
//!
//! The fetcher talks to the network through the [`Transport`] trait. Production code
//! uses [`ReqwestTransport`]; tests substitute scripted implementations.

use crate::ACCEPT_LANGUAGE;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// A single outbound GET request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    /// Sent as the `User-Agent` header
    pub user_agent: String,
}

impl FetchRequest {
    pub fn new(url: Url, user_agent: impl Into<String>) -> Self {
        Self {
            url,
            user_agent: user_agent.into(),
        }
    }

    /// Headers every attempt carries
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            ("User-Agent", self.user_agent.as_str()),
            ("Accept-Language", ACCEPT_LANGUAGE),
        ]
    }
}

/// A completed HTTP exchange
///
/// Any status code is a response; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::InvalidRequest(e.to_string())
        } else if e.is_timeout() {
            Self::Network(format!("timed out: {}", e))
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Issues one HTTP GET per call
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Builds the shared HTTP client
///
/// The `User-Agent` is set per request, so one client serves every identity.
/// Overall timeouts are applied by the fetcher; only connection setup is bounded here.
///
/// # Example
///
/// ```no_run
/// use hearth_crawl::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let builder = request
            .headers()
            .into_iter()
            .fold(self.client.get(request.url.clone()), |builder, (name, value)| {
                builder.header(name, value)
            });
        let response = builder.send().await?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            url,
            status,
            content_type,
            body,
        })
    }
}

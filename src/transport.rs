//! HTTP transport layer
//!
//! The [`Transport`] trait is the seam between the resilience pipeline and the
//! actual HTTP stack: it executes exactly one request and has no retry or
//! breaker awareness of its own. [`ReqwestTransport`] is the production
//! implementation; tests substitute a mock.

use crate::errors::Error;
use crate::outcome::CallResult;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;
use url::Url;

/// An outbound HTTP request handed to the pipeline.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a request with the given method and URL.
    pub fn new(method: Method, url: &str) -> Result<Self, Error> {
        Ok(Self {
            method,
            url: url.parse()?,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Creates a GET request.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new(Method::GET, url)
    }

    /// Creates a POST request with a body.
    pub fn post(url: &str, body: impl Into<Bytes>) -> Result<Self, Error> {
        let mut request = Self::new(Method::POST, url)?;
        request.body = Some(body.into());
        Ok(request)
    }

    /// Adds a header, rejecting invalid names or values.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name: http::header::HeaderName = name
            .parse()
            .map_err(|_| Error::configuration(format!("Invalid header name: {}", name)))?;
        let value = value
            .parse()
            .map_err(|_| Error::configuration(format!("Invalid header value for {}", name)))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// An HTTP response as seen by the resilience layer.
///
/// Any status code is a valid response here; deciding whether a 503 is a
/// failure belongs to the classifiers, not the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The underlying call executor.
///
/// Implementations are pure executors: one request in, one response or
/// transport error out.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a single HTTP request.
    async fn send(&self, request: HttpRequest) -> CallResult;
}

/// Reqwest-based transport implementation.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(20)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> CallResult {
        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

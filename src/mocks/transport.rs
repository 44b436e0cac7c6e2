//! Mock transport for testing.

use crate::errors::Error;
use crate::outcome::CallResult;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A canned reply for the mock transport to return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// A plain 200 response.
    pub fn ok() -> Self {
        Self::status(200)
    }

    /// An empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A JSON response with the given status and body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );
        Self {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    /// A failing response carrying a delta-seconds `Retry-After` header.
    pub fn retry_after(status: u16, seconds: u64) -> Self {
        let mut response = Self::status(status);
        response.headers.insert(
            http::header::RETRY_AFTER,
            seconds.to_string().parse().unwrap(),
        );
        response
    }

    fn into_http(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// In-memory [`Transport`] that replays canned results and records requests.
#[derive(Default)]
pub struct MockTransport {
    results: Mutex<VecDeque<Result<MockResponse, Error>>>,
    default_response: Option<MockResponse>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates an empty mock; unexpected calls fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that answers every call with `response`.
    pub fn replying(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::default()
        }
    }

    /// Adds an artificial delay to every call, to widen race windows in
    /// concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a response for the next unanswered call.
    pub fn enqueue(&self, response: MockResponse) {
        self.results.lock().unwrap().push_back(Ok(response));
    }

    /// Queues a transport error for the next unanswered call.
    pub fn enqueue_error(&self, error: Error) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// Number of calls that reached the transport.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// All recorded requests, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> CallResult {
        self.requests.lock().unwrap().push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self.results.lock().unwrap().pop_front();
        match queued {
            Some(Ok(response)) => Ok(response.into_http()),
            Some(Err(error)) => Err(error),
            None => match &self.default_response {
                Some(response) => Ok(response.clone().into_http()),
                None => Err(Error::Internal {
                    message: "MockTransport: no response queued".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_results_in_order() {
        let transport = MockTransport::new();
        transport.enqueue(MockResponse::status(503));
        transport.enqueue(MockResponse::ok());

        let request = HttpRequest::get("https://upstream.example/").unwrap();
        assert_eq!(transport.send(request.clone()).await.unwrap().status, 503);
        assert_eq!(transport.send(request.clone()).await.unwrap().status, 200);
        assert!(transport.send(request).await.is_err());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn default_response_answers_everything() {
        let transport = MockTransport::replying(MockResponse::json(
            200,
            serde_json::json!({ "ok": true }),
        ));
        let request = HttpRequest::get("https://upstream.example/").unwrap();

        for _ in 0..3 {
            let response = transport.send(request.clone()).await.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.header("content-type"), Some("application/json"));
        }
    }

    #[test]
    fn retry_after_helper_sets_the_header() {
        let response = MockResponse::retry_after(429, 45).into_http();
        assert_eq!(response.header("retry-after"), Some("45"));
    }
}

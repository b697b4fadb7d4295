//! HTTP transport used by the metadata client
//!
//! The client only needs "send this, give me status and body", so the transport is a
//! small trait. Tests swap in in-memory implementations.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::OllamaError;

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait - anything that can issue the two requests the client needs
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, OllamaError>;
    async fn post_json(&self, url: &str, body: Value) -> Result<HttpResponse, OllamaError>;
}

/// reqwest-backed transport with a per-request timeout
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("ollama-tools/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, OllamaError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, OllamaError> {
        self.send(self.client.get(url)).await
    }

    async fn post_json(&self, url: &str, body: Value) -> Result<HttpResponse, OllamaError> {
        self.send(self.client.post(url).json(&body)).await
    }
}

fn network_error(e: reqwest::Error) -> OllamaError {
    if e.is_timeout() {
        OllamaError::Network(format!("request timed out: {}", e))
    } else {
        OllamaError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let mut response = HttpResponse {
            status: 200,
            body: String::new(),
        };
        assert!(response.is_success());

        response.status = 204;
        assert!(response.is_success());

        response.status = 199;
        assert!(!response.is_success());

        response.status = 404;
        assert!(!response.is_success());
    }
}

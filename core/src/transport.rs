//! The network boundary.
//!
//! # Design
//! Resource clients never perform I/O themselves: they hand a fully resolved
//! `HttpRequest` to a `Transport` and parse whatever `HttpResponse` comes
//! back. Non-2xx statuses are returned as data, not errors, so status
//! interpretation stays in one place (`resource::parse_response`). Only
//! failures that produce no response at all become `ApiError::Transport`.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut url = Url::parse(&request.path)
            .map_err(|e| ApiError::argument(format!("invalid request url `{}`: {e}", request.path)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self.client.request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!(status, "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_fails_before_sending() {
        let request = HttpRequest {
            method: HttpMethod::Get,
            path: "not a url/organizations".to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        };
        let err = ReqwestTransport::new().execute(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = HttpRequest {
            method: HttpMethod::Get,
            path: format!("http://{addr}/organizations"),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        };
        let err = ReqwestTransport::new().execute(request).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}

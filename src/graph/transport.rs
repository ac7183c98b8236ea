//! Transport seam between Graph operations and the HTTP client.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Body of an outgoing Graph request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// A single Graph request with an already resolved URL.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub method: Method,
    pub url: String,
    pub content_type: Option<String>,
    pub body: RequestBody,
}

impl GraphRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            content_type: None,
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            content_type: Some("application/json".to_string()),
            body: RequestBody::Json(body),
        }
    }

    pub fn put_bytes(url: impl Into<String>, data: Vec<u8>, content_type: &str) -> Self {
        Self {
            method: Method::PUT,
            url: url.into(),
            content_type: Some(content_type.to_string()),
            body: RequestBody::Bytes(data),
        }
    }

    /// JSON body, if any.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A fully buffered Graph response.
#[derive(Debug, Clone)]
pub struct GraphResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl GraphResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Number of body bytes received.
    pub fn bytes_returned(&self) -> usize {
        self.body.len()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::ParseFailed(e.to_string()))
    }

    /// Body pretty-printed when it is JSON, raw text otherwise.
    pub fn pretty_body(&self) -> String {
        match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| self.text()),
            Err(_) => self.text(),
        }
    }
}

/// Sends Graph requests on behalf of an authenticated user.
///
/// Implementations return every HTTP status as a response; only transport
/// failures become errors.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(GraphResponse::new(200, "").is_success());
        assert!(GraphResponse::new(201, "").is_success());
        assert!(GraphResponse::new(299, "").is_success());
        assert!(!GraphResponse::new(302, "").is_success());
        assert!(!GraphResponse::new(404, "").is_success());
    }

    #[test]
    fn test_pretty_body() {
        let resp = GraphResponse::new(400, r#"{"error":{"code":"BadRequest"}}"#);
        assert!(resp.pretty_body().contains("\"code\": \"BadRequest\""));

        let resp = GraphResponse::new(502, "Bad Gateway");
        assert_eq!(resp.pretty_body(), "Bad Gateway");
    }

    #[test]
    fn test_json_parse_failure() {
        let resp = GraphResponse::new(200, "not json");
        let result: Result<serde_json::Value, _> = resp.json();
        assert!(matches!(result, Err(ApiError::ParseFailed(_))));
    }
}

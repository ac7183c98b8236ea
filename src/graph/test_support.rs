use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;

use super::client::GraphClient;
use super::endpoint::EndpointResolver;
use super::transport::{GraphRequest, GraphResponse, GraphTransport};
use crate::error::ApiError;

pub(crate) const TEST_BASE_URL: &str = "https://graph.microsoft.com";
pub(crate) const TEST_VERSION: &str = "beta";

struct Route {
    method: Method,
    path: String,
    response: GraphResponse,
}

// Canned responses keyed by method and Graph path; records every request.
pub(crate) struct MockTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on(mut self, method: Method, path: &str, response: GraphResponse) -> Self {
        self.routes.push(Route {
            method,
            path: path.trim_start_matches('/').to_string(),
            response,
        });
        self
    }

    pub(crate) fn requests(&self) -> Vec<GraphRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }

    /// Graph paths (relative to the versioned base) in call order.
    pub(crate) fn paths(&self) -> Vec<String> {
        let prefix = format!("{}/{}/", TEST_BASE_URL, TEST_VERSION);
        self.requests()
            .into_iter()
            .map(|r| r.url.trim_start_matches(&prefix).to_string())
            .collect()
    }
}

#[async_trait]
impl GraphTransport for MockTransport {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse, ApiError> {
        let prefix = format!("{}/{}/", TEST_BASE_URL, TEST_VERSION);
        let path = request.url.trim_start_matches(&prefix).to_string();
        let response = self
            .routes
            .iter()
            .find(|route| route.method == request.method && route.path == path)
            .map(|route| route.response.clone())
            .unwrap_or_else(|| GraphResponse::new(404, r#"{"error":{"code":"NoRoute"}}"#));

        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request);
        Ok(response)
    }
}

pub(crate) fn mock_client(transport: MockTransport) -> GraphClient<MockTransport> {
    GraphClient::new(transport, EndpointResolver::new(TEST_BASE_URL, TEST_VERSION))
}

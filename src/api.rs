use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::session::TokenStore;

/// Response payload: parsed JSON when the body is JSON, otherwise the
/// raw text. Callers must tolerate either shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Body::Json(value),
            Err(_) => Body::Text(text.to_string()),
        }
    }

    /// Best-effort human-readable message for alerts.
    pub fn message(&self) -> String {
        match self {
            Body::Text(text) => text.trim().to_string(),
            Body::Json(Value::String(text)) => text.clone(),
            Body::Json(value) => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    /// Session token carried by the login endpoints, when present.
    pub fn token(&self) -> Option<&str> {
        match &self.body {
            Body::Json(value) => value.get("token").and_then(Value::as_str),
            Body::Text(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 or 410; both mean the session is gone and the user has to
    /// sign in again.
    #[error("{message}")]
    Expired { status: u16, message: String },
    /// Other 4xx: the server rejected the request and said why.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// 5xx, stray 1xx/3xx, or a response we could not make sense of.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

fn message_or(body: &Body, fallback: impl FnOnce() -> String) -> String {
    let message = body.message();
    if message.is_empty() {
        fallback()
    } else {
        message
    }
}

/// Statuses in [200,300) resolve; everything else becomes a tagged
/// failure so call sites handle both branches explicitly.
pub fn outcome(status: u16, body: Body) -> Result<ApiResponse, ApiError> {
    match status {
        200..=299 => Ok(ApiResponse { status, body }),
        401 | 410 => Err(ApiError::Expired {
            status,
            message: message_or(&body, || "Session expired.".to_string()),
        }),
        400..=499 => Err(ApiError::Rejected {
            status,
            message: message_or(&body, || format!("Request failed with status {status}.")),
        }),
        _ => Err(ApiError::Server {
            status,
            message: message_or(&body, || format!("Request failed with status {status}.")),
        }),
    }
}

/// The seam between the app and the network. Production uses
/// [`HttpTransport`]; tests script responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
}

impl HttpTransport {
    pub fn new(base_url: &str, store: Arc<TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    // One attempt per call: no retry, no timeout beyond reqwest's
    // defaults, no cancellation.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending request");

        let mut request = self.client.request(method, &url);
        // The portal authenticates every request by session cookie.
        if let Some(token) = self.store.load() {
            request = request.header(COOKIE, format!("session={token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        outcome(status, Body::parse(&text))
    }
}

//! HTTP transport seam.
//!
//! The executor speaks to the network through the [`Transport`] trait. The
//! production implementation is [`ReqwestTransport`]; tests swap in a scripted
//! transport so request ordering, delays and failures can be controlled.

mod reqwest_transport;

#[cfg(test)]
pub(crate) mod mock;

pub use reqwest_transport::ReqwestTransport;

pub use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};

use async_trait::async_trait;
use thiserror::Error;

/// Request body as handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON; `Content-Type: application/json` is added unless
    /// the caller supplied a content type.
    Json(serde_json::Value),
    /// Sent untransformed (multipart uploads, pre-encoded payloads). The
    /// caller is responsible for the `Content-Type` header.
    Raw(Vec<u8>),
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A fully resolved request ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Status and raw body of a received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub const fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// True when the body holds nothing but whitespace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }
}

/// Errors raised below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("{0}")]
    Network(String),

    /// The underlying client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Sends one request and returns the raw response.
///
/// Implementations must not interpret status codes; classification happens in
/// the executor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

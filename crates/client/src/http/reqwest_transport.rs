//! [`Transport`] backed by `reqwest`.

use std::error::Error as _;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ClientConfig;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

/// HTTP transport over a shared `reqwest::Client`.
///
/// Cloning is cheap; the connection pool is shared.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from client configuration.
    ///
    /// No request timeout is set: a hung call waits until the connection
    /// itself fails. Only the connect phase is bounded, and only when
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Build` if the TLS backend cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network_error)?;

        debug!(status = %status, bytes = body.len(), "Received response");

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Flatten a reqwest error and its sources into one message.
///
/// `reqwest::Error`'s own display hides the cause ("error sending request"),
/// which is the part a user can act on (connection refused, DNS failure).
fn network_error(error: reqwest::Error) -> TransportError {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TransportError::Network(message)
}

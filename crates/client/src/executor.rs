//! Request executor.
//!
//! Issues exactly one HTTP request and folds everything that can happen to it
//! into a [`RequestResult`]: decoded success, classified failure, or
//! cancellation. Nothing in here returns `Err` or panics on a bad response.

use std::sync::Arc;

use futures::future::{AbortRegistration, Abortable};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::error::RequestError;
use crate::http::{
    Body, HeaderMap, HeaderName, HeaderValue, HttpRequest, HttpResponse, Method, StatusCode,
    Transport, header,
};
use crate::messages;
use crate::token::TokenStore;

const JSON_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// Request / Result types
// =============================================================================

/// Everything the executor needs to issue one request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub method: Method,
    pub body: Option<Body>,
    pub headers: HeaderMap,
    pub auth: bool,
}

impl RequestSpec {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: HeaderMap::new(),
            auth: false,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn with_auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestResult {
    /// 2xx. `data` is `None` for 204 and empty bodies.
    Success {
        data: Option<Value>,
        status: StatusCode,
    },
    /// Anything that is not a 2xx with a decodable body.
    Failure(RequestError),
    /// Aborted by its owner before it settled. Not an error.
    Cancelled,
}

impl RequestResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Success { status, .. } => Some(*status),
            Self::Failure(err) => err.status(),
            Self::Cancelled => None,
        }
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&RequestError> {
        match self {
            Self::Failure(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Issues requests through a [`Transport`], attaching stored credentials.
///
/// Cloning is cheap; clones share the transport and token store.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    base_url: String,
}

impl Executor {
    /// Create an executor.
    ///
    /// Relative request URLs are joined onto `base_url`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore, base_url: &str) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                transport,
                tokens,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Resolve a request URL against the base URL.
    ///
    /// Absolute `http(s)` URLs are used as-is.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.inner.base_url, url.trim_start_matches('/'))
        }
    }

    /// Execute a request.
    #[instrument(
        skip(self, spec),
        fields(method = %spec.method, url = %spec.url, auth = spec.auth)
    )]
    pub async fn execute(&self, spec: RequestSpec) -> RequestResult {
        let request = self.build_request(spec);

        match self.inner.transport.send(request).await {
            Ok(response) => classify(&response),
            Err(e) => {
                warn!(error = %e, "Request failed before a response was received");
                RequestResult::Failure(RequestError::Network {
                    message: messages::network_failure(&e.to_string()),
                })
            }
        }
    }

    /// Execute a request that its owner may abort.
    ///
    /// Aborting through the paired `AbortHandle` drops the in-flight request
    /// and yields [`RequestResult::Cancelled`].
    pub async fn execute_abortable(
        &self,
        spec: RequestSpec,
        registration: AbortRegistration,
    ) -> RequestResult {
        match Abortable::new(self.execute(spec), registration).await {
            Ok(result) => result,
            Err(_aborted) => {
                debug!("Request aborted by its owner");
                RequestResult::Cancelled
            }
        }
    }

    /// `Authorization` value for the stored token, if there is a usable one.
    ///
    /// A missing token still lets the request go out; the server answers 401.
    fn bearer_header(&self) -> Option<HeaderValue> {
        let Some(token) = self.inner.tokens.get_token() else {
            debug!("Authenticated request without a stored token");
            return None;
        };
        let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        else {
            warn!("Stored token is not a valid header value; sending without it");
            return None;
        };
        value.set_sensitive(true);
        Some(value)
    }

    fn build_request(&self, spec: RequestSpec) -> HttpRequest {
        let RequestSpec {
            url,
            method,
            body,
            mut headers,
            auth,
        } = spec;

        if auth && let Some(value) = self.bearer_header() {
            headers.insert(header::AUTHORIZATION, value);
        }

        if !headers.contains_key(header::ACCEPT) {
            headers.insert(header::ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        let body = body.map(|body| match body {
            Body::Json(value) => {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(JSON_CONTENT_TYPE),
                    );
                }
                value.to_string().into_bytes()
            }
            Body::Raw(bytes) => bytes,
        });

        HttpRequest {
            method,
            url: self.resolve_url(&url),
            headers,
            body,
        }
    }
}

// =============================================================================
// Response classification
// =============================================================================

fn classify(response: &HttpResponse) -> RequestResult {
    let status = response.status;

    if status == StatusCode::UNAUTHORIZED {
        // Stored credentials stay in place. Only logout clears them.
        warn!("Request unauthorized");
        return RequestResult::Failure(RequestError::Unauthorized {
            message: messages::ACCESS_DENIED.to_string(),
        });
    }

    if status.is_success() {
        if status == StatusCode::NO_CONTENT || response.is_empty() {
            return RequestResult::Success { data: None, status };
        }

        return match serde_json::from_slice::<Value>(&response.body) {
            Ok(data) => RequestResult::Success {
                data: Some(data),
                status,
            },
            Err(e) => {
                error!(
                    status = %status,
                    error = %e,
                    body = %truncate(&response.body, 500),
                    "Failed to parse response body"
                );
                RequestResult::Failure(RequestError::Decode {
                    status,
                    message: messages::invalid_response(&e.to_string()),
                })
            }
        };
    }

    let message =
        extract_error_message(&response.body).unwrap_or_else(|| messages::request_failed(status));

    if status.is_server_error() {
        error!(
            status = %status,
            body = %truncate(&response.body, 500),
            "Backend returned server error"
        );
        RequestResult::Failure(RequestError::Server { status, message })
    } else {
        debug!(status = %status, message = %message, "Backend rejected request");
        RequestResult::Failure(RequestError::Rejected { status, message })
    }
}

/// Conventional error envelope: `{"detail": ...}` or `{"message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Pull a human-readable message out of an error body.
///
/// Array-valued `detail` (validation errors, `[{"loc": .., "msg": ..}]`) is
/// joined into one string.
fn extract_error_message(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;

    let from_detail = match envelope.detail {
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(issues)) => Some(
            issues
                .iter()
                .filter_map(|issue| issue.get("msg").and_then(Value::as_str))
                .filter(|msg| !msg.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    };

    from_detail
        .into_iter()
        .chain(envelope.message)
        .map(|m| m.trim().to_string())
        .find(|m| !m.is_empty())
}

fn truncate(body: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(body).chars().take(max_chars).collect()
}

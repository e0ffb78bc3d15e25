//! Mutation hook: uncached writes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::error::RequestError;
use crate::executor::{Executor, RequestResult, RequestSpec};
use crate::http::{Body, HeaderMap, HeaderName, HeaderValue, Method};

/// How to issue one write.
#[derive(Debug, Clone)]
pub struct MutateOptions {
    pub method: Method,
    pub body: Option<Body>,
    pub headers: HeaderMap,
    pub auth: bool,
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self::new(Method::POST)
    }
}

impl MutateOptions {
    /// Authenticated write with no body.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: HeaderMap::new(),
            auth: true,
        }
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
    pub const fn with_auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }
}

/// Result of a write. Every outcome, including network failure, is a value.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<RequestError>,
    /// `None` when no response was received.
    pub status: Option<u16>,
}

impl MutationOutcome {
    /// Decode the response body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .as_ref()
            .map(|data| T::deserialize(data))
            .transpose()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(RequestError::message)
    }
}

impl From<RequestResult> for MutationOutcome {
    fn from(result: RequestResult) -> Self {
        match result {
            RequestResult::Success { data, status } => Self {
                success: true,
                data,
                error: None,
                status: Some(status.as_u16()),
            },
            RequestResult::Failure(error) => Self {
                success: false,
                data: None,
                status: error.status().map(|s| s.as_u16()),
                error: Some(error),
            },
            RequestResult::Cancelled => Self {
                success: false,
                data: None,
                error: None,
                status: None,
            },
        }
    }
}

/// State published by a [`MutationHook`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<RequestError>,
    pub data: Option<Value>,
}

/// Issues writes and publishes their progress.
///
/// Cloning is cheap; clones share published state.
#[derive(Clone)]
pub struct MutationHook {
    inner: Arc<MutationInner>,
}

struct MutationInner {
    executor: Executor,
    state: watch::Sender<MutationState>,
}

impl MutationHook {
    #[must_use]
    pub fn new(executor: Executor) -> Self {
        Self {
            inner: Arc::new(MutationInner {
                executor,
                state: watch::Sender::new(MutationState::default()),
            }),
        }
    }

    /// Issue one write.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn mutate(&self, url: &str, options: MutateOptions) -> MutationOutcome {
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let MutateOptions {
            method,
            body,
            headers,
            auth,
        } = options;
        let mut spec = RequestSpec::new(method, url)
            .with_headers(headers)
            .with_auth(auth);
        spec.body = body;

        let outcome = MutationOutcome::from(self.inner.executor.execute(spec).await);
        debug!(success = outcome.success, status = ?outcome.status, "Mutation settled");

        self.inner.state.send_modify(|state| {
            state.loading = false;
            state.error.clone_from(&outcome.error);
            state.data.clone_from(&outcome.data);
        });

        outcome
    }

    pub async fn post(&self, url: &str, body: Value) -> MutationOutcome {
        self.mutate(url, MutateOptions::new(Method::POST).with_body(body))
            .await
    }

    pub async fn put(&self, url: &str, body: Value) -> MutationOutcome {
        self.mutate(url, MutateOptions::new(Method::PUT).with_body(body))
            .await
    }

    pub async fn patch(&self, url: &str, body: Option<Value>) -> MutationOutcome {
        let mut options = MutateOptions::new(Method::PATCH);
        options.body = body.map(Body::Json);
        self.mutate(url, options).await
    }

    pub async fn delete(&self, url: &str) -> MutationOutcome {
        self.mutate(url, MutateOptions::new(Method::DELETE)).await
    }

    /// Forget the last outcome.
    pub fn reset(&self) {
        self.inner.state.send_replace(MutationState::default());
    }

    #[must_use]
    pub fn state(&self) -> MutationState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.inner.state.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;
    use crate::http::header;
    use crate::http::mock::{Reply, ScriptedTransport};
    use crate::token::TokenStore;
    use crate::token::tests::token_expiring_in;

    fn hook<F>(handler: F) -> (MutationHook, ScriptedTransport, TokenStore)
    where
        F: Fn(&crate::http::HttpRequest) -> Reply + Send + Sync + 'static,
    {
        let transport = ScriptedTransport::new(handler);
        let tokens = TokenStore::in_memory();
        let executor =
            Executor::new(Arc::new(transport.clone()), tokens.clone(), "http://api.test");
        (MutationHook::new(executor), transport, tokens)
    }

    #[tokio::test]
    async fn test_created_item() {
        let (hook, transport, tokens) = hook(|_| Reply::json(201, r#"{"item_id":9}"#));
        tokens.set_tokens("tok", None);

        let outcome = hook
            .post("/cart/items", json!({"variant_id": 5, "quantity": 2}))
            .await;

        assert_eq!(
            outcome,
            MutationOutcome {
                success: true,
                data: Some(json!({"item_id": 9})),
                error: None,
                status: Some(201),
            }
        );
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.get(header::AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(hook.state().data, Some(json!({"item_id": 9})));
    }

    #[tokio::test]
    async fn test_validation_error_is_a_value() {
        let (hook, _, _) = hook(|_| {
            Reply::json(422, r#"{"detail":[{"loc":["body","qty"],"msg":"must be positive"}]}"#)
        });

        let outcome = hook
            .put("/cart/items/3", json!({"quantity": -1}))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(422));
        assert!(outcome.error_message().unwrap().contains("must be positive"));
        assert!(!hook.state().loading);
        assert!(hook.state().error.is_some());
    }

    #[tokio::test]
    async fn test_network_failure_is_a_value() {
        let (hook, _, _) = hook(|_| Reply::Fail("connection reset".to_string()));

        let outcome = hook.delete("/wishlist/4").await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, None);
        assert!(matches!(outcome.error, Some(RequestError::Network { .. })));
    }

    #[tokio::test]
    async fn test_delete_no_content() {
        let (hook, transport, _) = hook(|_| Reply::json(204, ""));

        let outcome = hook.delete("/cart/items/3").await;

        assert!(outcome.success);
        assert_eq!(outcome.data, None);
        assert_eq!(outcome.status, Some(204));
        assert_eq!(transport.requests()[0].method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_unauthorized_keeps_token() {
        let (hook, _, tokens) = hook(|_| Reply::json(401, ""));
        let token = token_expiring_in(Duration::minutes(30));
        tokens.set_tokens(&token, Some("refresh"));

        let outcome = hook.patch("/notifications/1/read", None).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().is_unauthorized());
        assert_eq!(tokens.get_token().unwrap().expose_secret(), token);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let (hook, _, _) = hook(|_| Reply::json(500, ""));
        hook.post("/checkout", json!({})).await;
        assert!(hook.state().error.is_some());

        hook.reset();
        assert_eq!(hook.state(), MutationState::default());
    }

    #[tokio::test]
    async fn test_anonymous_write() {
        let (hook, transport, tokens) = hook(|_| Reply::json(200, r#"{"ok":true}"#));
        tokens.set_tokens("tok", None);

        let outcome = hook
            .mutate(
                "/newsletter",
                MutateOptions::new(Method::POST)
                    .with_body(json!({"email": "an@example.vn"}))
                    .with_auth(false),
            )
            .await;

        assert!(outcome.success);
        assert!(transport.requests()[0].headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_cancelled_outcome_has_no_error() {
        let outcome = MutationOutcome::from(RequestResult::Cancelled);
        assert!(!outcome.success);
        assert!(outcome.error.is_none());
    }
}

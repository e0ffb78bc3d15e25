//! Notification badge context.

use std::sync::Arc;

use shopfront_core::{NotificationId, UnreadCount};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::client::Shopfront;
use crate::context::{ContextError, Scope};
use crate::endpoints;
use crate::hooks::{FetchHook, FetchOptions, MutationHook, MutationOutcome};
use crate::messages;
use crate::token::TokenStore;

/// State published by the notification context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub unread: UnreadCount,
    pub loading: bool,
    pub error: Option<String>,
}

/// Mounts a [`NotificationContext`] into a scope.
pub struct NotificationProvider;

impl NotificationProvider {
    /// Create a child scope carrying a notification context and load the
    /// unread count.
    pub async fn mount(parent: &Scope, client: &Shopfront) -> Scope {
        let scope = parent.child();
        let notifications = NotificationContext::new(client);
        scope.provide(notifications.clone());
        notifications.refresh().await;
        scope
    }
}

/// The nearest notification context.
///
/// # Errors
///
/// Returns `ContextError::MissingProvider` outside a [`NotificationProvider`]
/// subtree.
pub fn use_notifications(scope: &Scope) -> Result<NotificationContext, ContextError> {
    scope.consume::<NotificationContext>()
}

#[derive(Clone)]
pub struct NotificationContext {
    inner: Arc<NotificationInner>,
}

struct NotificationInner {
    tokens: TokenStore,
    unread: FetchHook,
    mutation: MutationHook,
    state: watch::Sender<NotificationState>,
}

impl std::fmt::Debug for NotificationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationContext")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl NotificationContext {
    #[must_use]
    pub fn new(client: &Shopfront) -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                tokens: client.tokens().clone(),
                unread: client.use_fetch(
                    Some(endpoints::NOTIFICATIONS_UNREAD_COUNT),
                    FetchOptions::authenticated().skip_cache(),
                ),
                mutation: client.use_mutation(),
                state: watch::Sender::new(NotificationState::default()),
            }),
        }
    }

    /// Re-read the unread count. Zero without a valid login.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> NotificationState {
        let inner = &self.inner;

        if !inner.tokens.is_authenticated() {
            debug!("Not logged in; unread count is zero");
            inner.unread.unmount();
            inner.state.send_replace(NotificationState::default());
            return self.state();
        }

        inner.state.send_modify(|state| state.loading = true);
        let fetched = inner.unread.refetch().await;

        inner.state.send_modify(|state| {
            state.loading = false;
            if let Some(message) = fetched.error_message() {
                state.error = Some(message.to_string());
                return;
            }
            match fetched.decode::<UnreadCount>() {
                Ok(count) => {
                    state.unread = count.unwrap_or_default();
                    state.error = None;
                }
                Err(e) => state.error = Some(messages::invalid_response(&e.to_string())),
            }
        });

        self.state()
    }

    pub async fn mark_read(&self, id: NotificationId) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .patch(&endpoints::notification_read(id), None)
            .await;
        self.after_write(outcome).await
    }

    pub async fn mark_all_read(&self) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .patch(endpoints::NOTIFICATIONS_READ_ALL, None)
            .await;
        self.after_write(outcome).await
    }

    pub async fn delete(&self, id: NotificationId) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .delete(&endpoints::notification(id))
            .await;
        self.after_write(outcome).await
    }

    pub fn reset(&self) {
        self.inner.unread.unmount();
        self.inner.mutation.reset();
        self.inner.state.send_replace(NotificationState::default());
    }

    #[must_use]
    pub fn unread_count(&self) -> u64 {
        self.inner.state.borrow().unread.unread_count
    }

    #[must_use]
    pub fn state(&self) -> NotificationState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.inner.state.subscribe()
    }

    async fn after_write(&self, outcome: MutationOutcome) -> MutationOutcome {
        if !outcome.success {
            warn!(status = ?outcome.status, "Notification write failed");
        }
        self.refresh().await;
        if let Some(message) = outcome.error_message() {
            let message = message.to_string();
            self.inner.state.send_modify(|state| state.error = Some(message));
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::Duration;

    use super::*;
    use crate::http::Method;
    use crate::http::mock::{Reply, ScriptedTransport};
    use crate::storage::MemoryStorage;
    use crate::token::tests::token_expiring_in;

    fn setup(unread: u64) -> (NotificationContext, ScriptedTransport, Shopfront) {
        let count = Arc::new(AtomicU64::new(unread));
        let transport = ScriptedTransport::new(move |req| {
            if req.method == Method::PATCH && req.url.ends_with("/read-all") {
                count.store(0, Ordering::SeqCst);
                return Reply::json(200, r#"{"updated":true}"#);
            }
            if req.method == Method::PATCH || req.method == Method::DELETE {
                let _ =
                    count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
                return Reply::json(204, "");
            }
            Reply::json(200, &format!(r#"{{"unread_count":{}}}"#, count.load(Ordering::SeqCst)))
        });
        let client = Shopfront::with_transport(
            "http://api.test",
            Arc::new(transport.clone()),
            Arc::new(MemoryStorage::new()),
        );
        client
            .tokens()
            .set_tokens(&token_expiring_in(Duration::hours(1)), None);
        (NotificationContext::new(&client), transport, client)
    }

    #[tokio::test]
    async fn test_refresh_reads_count() {
        let (notifications, transport, _client) = setup(4);
        notifications.refresh().await;

        assert_eq!(notifications.unread_count(), 4);
        assert_eq!(transport.calls_to("/notifications/unread-count"), 1);
    }

    #[tokio::test]
    async fn test_mark_read_refetches() {
        let (notifications, transport, _client) = setup(2);
        notifications.refresh().await;

        let outcome = notifications.mark_read(NotificationId::new(7)).await;

        assert!(outcome.success);
        assert_eq!(notifications.unread_count(), 1);
        assert_eq!(transport.calls_to("/notifications/7/read"), 1);
        assert_eq!(transport.calls_to("/notifications/unread-count"), 2);
    }

    #[tokio::test]
    async fn test_mark_all_read_and_delete() {
        let (notifications, _, _client) = setup(5);
        notifications.refresh().await;

        notifications.mark_all_read().await;
        assert_eq!(notifications.unread_count(), 0);

        let outcome = notifications.delete(NotificationId::new(1)).await;
        assert!(outcome.success);
        assert_eq!(notifications.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_is_zero_without_requests() {
        let (notifications, transport, client) = setup(3);
        client.tokens().clear_tokens();

        let state = notifications.refresh().await;

        assert_eq!(state, NotificationState::default());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_scope() {
        let (_, _, client) = setup(1);
        let root = Scope::root();
        assert!(use_notifications(&root).is_err());

        let scope = NotificationProvider::mount(&root, &client).await;
        assert_eq!(use_notifications(&scope).unwrap().unread_count(), 1);
    }
}

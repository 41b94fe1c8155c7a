//! Remote collaborators consumed by the client core.
//!
//! The backend-as-a-service is opaque: a row store addressed by table and
//! an auth service that emits lifecycle events. Both are traits so the core
//! can be driven by fakes in tests.

pub mod memory;

use crate::error::AppError;
use crate::model::{AuthEvent, Session};
use serde_json::Value;
use std::future::Future;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Tasks,
    Categories,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Categories => "categories",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

impl Order {
    pub fn ascending(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub fn descending(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// Row-oriented remote data store. Rows are JSON objects using the wire
/// field names; ownership scoping happens remotely.
pub trait RowStore: Send + Sync {
    fn select(
        &self,
        table: Table,
        order: &Order,
    ) -> impl Future<Output = Result<Vec<Value>, AppError>> + Send;

    /// Inserts one row and returns it as stored (with remote defaults).
    fn insert(&self, table: Table, row: Value)
    -> impl Future<Output = Result<Value, AppError>> + Send;

    /// Applies `patch` to the row with `id` and returns the updated row.
    fn update(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send;

    fn delete(&self, table: Table, id: &str) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    /// Only this device.
    Local,
    /// Every session of the user on every device.
    Global,
    /// Every session except this one.
    Others,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Apple => "apple",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Github => "GitHub",
            Self::Apple => "Apple",
        }
    }
}

/// Live registration on the auth-event stream.
///
/// Dropping the subscription unsubscribes; [`AuthSubscription::unsubscribe`]
/// does the same explicitly.
pub struct AuthSubscription {
    events: mpsc::UnboundedReceiver<AuthEvent>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthSubscription {
    pub fn new<F>(events: mpsc::UnboundedReceiver<AuthEvent>, on_unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            events,
            on_unsubscribe: Some(Box::new(on_unsubscribe)),
        }
    }

    /// Next event, or `None` once the backend closed the stream.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.events.close();
        if let Some(callback) = self.on_unsubscribe.take() {
            callback();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("active", &self.on_unsubscribe.is_some())
            .finish()
    }
}

/// Remote authentication service.
///
/// OAuth sign-in is redirect based: success is observed later as a
/// signed-in event, not through the return value.
pub trait AuthBackend: Send + Sync {
    fn get_current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, AppError>> + Send;

    fn subscribe_auth_events(&self) -> AuthSubscription;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn sign_out(&self, scope: SignOutScope) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::AuthSubscription;
    use crate::model::AuthEvent;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn subscription_delivers_events_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = AuthSubscription::new(rx, || {});

        tx.send(AuthEvent::signed_out()).unwrap();
        drop(tx);

        assert_eq!(subscription.recv().await, Some(AuthEvent::signed_out()));
        assert_eq!(subscription.recv().await, None);
    }

    #[test]
    fn unsubscribe_runs_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (_tx, rx) = mpsc::unbounded_channel();
        let subscription = AuthSubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let _subscription = AuthSubscription::new(rx, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tx.send(AuthEvent::signed_out()).is_err());
    }
}

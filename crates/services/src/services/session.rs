use std::sync::Arc;

use backend::{AuthClient, AuthState, BackendError, Credentials, User};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use ts_rs::TS;

/// Which top-level surface the current auth state resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "view", rename_all = "camelCase")]
#[ts(export)]
pub enum GateView {
    Loading,
    Marketing,
    Dashboard { user: User },
}

impl From<&AuthState> for GateView {
    fn from(state: &AuthState) -> Self {
        match (&state.user, state.is_loading) {
            (_, true) => GateView::Loading,
            (Some(user), false) => GateView::Dashboard { user: user.clone() },
            (None, false) => GateView::Marketing,
        }
    }
}

/// Stops delivery when dropped.
#[must_use = "dropping a Subscription stops delivery"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn from_task(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Process-wide view of who is signed in.
#[derive(Clone)]
pub struct SessionContext {
    auth: Arc<dyn AuthClient>,
}

impl SessionContext {
    pub fn new(auth: Arc<dyn AuthClient>) -> Self {
        Self { auth }
    }

    pub fn state(&self) -> AuthState {
        self.auth.subscribe().borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    pub fn gate(&self) -> GateView {
        GateView::from(&self.state())
    }

    pub fn changes(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    /// Calls `callback` with the current state, then once per change.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(AuthState) + Send + 'static,
    {
        let mut rx = self.auth.subscribe();
        let task = tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                callback(state);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription::from_task(task)
    }

    /// Awaits `on_switch(previous_user_id)` each time the signed-in user signs
    /// out or is replaced. Switches are handled one at a time, in order.
    pub fn on_user_switch<F, Fut>(&self, mut on_switch: F) -> Subscription
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.auth.subscribe();
        let task = tokio::spawn(async move {
            let mut current: Option<String> = None;
            loop {
                let state = rx.borrow_and_update().clone();
                if !state.is_loading {
                    let user_id = state.user.map(|user| user.id);
                    if user_id != current {
                        if let Some(previous) = std::mem::replace(&mut current, user_id) {
                            tracing::debug!(user_id = %previous, "Releasing session panels");
                            on_switch(previous).await;
                        }
                    }
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription::from_task(task)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<User, BackendError> {
        self.auth.login(credentials).await
    }

    pub async fn logout(&self) -> Result<(), BackendError> {
        self.auth.logout().await
    }
}

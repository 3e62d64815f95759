use std::sync::Arc;

use tokio::sync::watch;

/// Session state as published by the authentication provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Still being resolved (e.g. session refresh in progress).
    Loading,
    Authenticated,
    Unauthenticated,
}

impl AuthStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AuthStatus::Loading)
    }
}

/// Watchable authentication status shared between the provider and flows.
///
/// Cloning yields another handle onto the same status.
#[derive(Debug, Clone)]
pub struct AuthState {
    tx: Arc<watch::Sender<AuthStatus>>,
}

impl AuthState {
    pub fn new(initial: AuthStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new status to every waiting flow.
    pub fn set(&self, status: AuthStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::debug!(?previous, ?status, "auth status changed");
        }
    }

    pub fn status(&self) -> AuthStatus {
        *self.tx.borrow()
    }

    /// Wait until the status is no longer [`AuthStatus::Loading`].
    pub async fn resolved(&self) -> AuthStatus {
        let mut rx = self.tx.subscribe();
        let status = match rx.wait_for(AuthStatus::is_resolved).await {
            Ok(status) => *status,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => AuthStatus::Unauthenticated,
        };
        status
    }
}

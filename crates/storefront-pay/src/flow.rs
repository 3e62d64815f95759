//! Payment verification flow.
//!
//! Runs when the payment gateway redirects the customer back with a
//! `reference`. A single task drives the state machine:
//!
//! ```text
//! AwaitingReference ──(no ref | not signed in)──────────────► Redirecting(Home)
//!        │
//!        └─(ref + signed in)─► Verifying ─┬─► Succeeded ─► Redirecting(Success)
//!                                         └─► Failed ────► Redirecting(Failure)
//! ```
//!
//! Success and failure are two arms of one `match`, so at most one redirect
//! fires per flow. Outcome redirects wait [`FlowConfig::redirect_delay`]
//! first; dropping or cancelling the [`FlowHandle`] during that window
//! aborts the task and nothing navigates.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::{AuthState, AuthStatus};
use crate::client::VerifyBackend;
use crate::constants::FlowConfig;
use crate::error::{FailureKind, VerifyError};
use crate::metrics;
use crate::navigate::{Destination, Navigator};
use crate::outcome::{classify, VerificationOutcome};
use crate::query::{QueryCache, QueryKey};
use crate::request::VerificationRequest;
use crate::response::VerificationResult;
use crate::retry::with_retry;

/// Observable state of one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Waiting for a reference and a resolved session.
    AwaitingReference,
    /// Confirmation request issued (or joined) for this reference.
    Verifying { reference: String },
    Succeeded { order_id: String },
    Failed { kind: FailureKind, reason: String },
    /// Destination decided; navigation follows after the redirect delay.
    Redirecting(Destination),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Redirecting(_))
    }
}

/// Verification flow wired to its collaborators.
///
/// Cheap to clone; clones share the backend, navigator, cache and auth state.
pub struct PaymentVerificationFlow<B, N> {
    backend: Arc<B>,
    navigator: Arc<N>,
    cache: Arc<QueryCache>,
    auth: AuthState,
    config: FlowConfig,
}

impl<B, N> Clone for PaymentVerificationFlow<B, N> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            navigator: Arc::clone(&self.navigator),
            cache: Arc::clone(&self.cache),
            auth: self.auth.clone(),
            config: self.config,
        }
    }
}

impl<B: VerifyBackend, N: Navigator> PaymentVerificationFlow<B, N> {
    pub fn new(backend: Arc<B>, navigator: Arc<N>, cache: Arc<QueryCache>, auth: AuthState) -> Self {
        Self {
            backend,
            navigator,
            cache,
            auth,
            config: FlowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the flow for a callback URL on the current tokio runtime.
    ///
    /// The flow lives as long as the returned handle.
    pub fn mount(&self, callback_url: &str) -> FlowHandle {
        self.mount_request(VerificationRequest::from_url(callback_url))
    }

    /// Start the flow for an already-parsed (or absent) reference.
    pub fn mount_request(&self, request: Option<VerificationRequest>) -> FlowHandle {
        let (tx, rx) = watch::channel(FlowState::AwaitingReference);
        let flow = self.clone();
        let task = tokio::spawn(async move { flow.run(request, &tx).await });
        FlowHandle {
            task: Some(task),
            state: rx,
        }
    }

    /// Drive the flow to completion on the calling task, publishing each
    /// state on `state`. Returns where the customer was sent.
    pub async fn run(
        &self,
        request: Option<VerificationRequest>,
        state: &watch::Sender<FlowState>,
    ) -> Destination {
        state.send_replace(FlowState::AwaitingReference);

        let auth = self.auth.resolved().await;
        let request = match (request, auth) {
            (Some(request), AuthStatus::Authenticated) => request,
            (None, _) => {
                tracing::info!(?auth, "no payment reference in callback, redirecting home");
                return self.go_home(FailureKind::MissingReference, state);
            }
            (Some(request), _) => {
                tracing::info!(
                    reference = %request,
                    "payment callback without a signed-in session, redirecting home"
                );
                return self.go_home(FailureKind::Unauthenticated, state);
            }
        };

        state.send_replace(FlowState::Verifying {
            reference: request.reference().to_string(),
        });
        tracing::info!(reference = %request, "verifying payment");

        let destination = match classify(self.verify(&request).await) {
            VerificationOutcome::Verified { order_id } => {
                tracing::info!(reference = %request, order_id = %order_id, "payment verified");
                state.send_replace(FlowState::Succeeded {
                    order_id: order_id.clone(),
                });
                self.refresh_order_state(&order_id);
                metrics::VERIFICATIONS
                    .with_label_values(&["succeeded"])
                    .inc();
                Destination::Success { order_id }
            }
            VerificationOutcome::Rejected { kind, reason } => {
                tracing::warn!(
                    reference = %request,
                    kind = %kind,
                    reason = %reason,
                    "payment verification failed"
                );
                state.send_replace(FlowState::Failed {
                    kind,
                    reason: reason.clone(),
                });
                metrics::VERIFICATIONS
                    .with_label_values(&[kind.as_str()])
                    .inc();
                Destination::Failure { reason }
            }
        };

        self.redirect_after(destination, self.config.redirect_delay, state)
            .await
    }

    /// Confirm `request` with the backend, retrying transient failures.
    ///
    /// Keyed by reference in the cache: concurrent callers share one request
    /// and a settled result is reused without another call.
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerifyError> {
        let key = QueryKey::Verification(request.reference().to_string());
        let backend = Arc::clone(&self.backend);
        let reference = request.reference().to_string();
        let policy = self.config.retry;

        self.cache
            .fetch_as(key, move || async move {
                let result = with_retry(&policy, |attempt| {
                    let backend = Arc::clone(&backend);
                    let reference = reference.clone();
                    async move {
                        tracing::debug!(reference = %reference, attempt, "sending confirmation request");
                        backend.verify(&reference).await
                    }
                })
                .await?;
                let value = serde_json::to_value(result)?;
                Ok::<_, VerifyError>(value)
            })
            .await
    }

    /// Mark the order, the order list and the cart stale so the next views
    /// refetch them.
    fn refresh_order_state(&self, order_id: &str) {
        for key in [
            QueryKey::Order(order_id.to_string()),
            QueryKey::Orders,
            QueryKey::Cart,
        ] {
            self.cache.invalidate(&key);
        }
    }

    fn go_home(&self, kind: FailureKind, state: &watch::Sender<FlowState>) -> Destination {
        metrics::VERIFICATIONS
            .with_label_values(&[kind.as_str()])
            .inc();
        let destination = Destination::Home;
        state.send_replace(FlowState::Redirecting(destination.clone()));
        self.navigator.navigate(&destination);
        destination
    }

    async fn redirect_after(
        &self,
        destination: Destination,
        delay: Duration,
        state: &watch::Sender<FlowState>,
    ) -> Destination {
        state.send_replace(FlowState::Redirecting(destination.clone()));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.navigator.navigate(&destination);
        destination
    }
}

/// Owner of a mounted flow. Dropping it tears the flow down.
pub struct FlowHandle {
    task: Option<JoinHandle<Destination>>,
    state: watch::Receiver<FlowState>,
}

impl FlowHandle {
    /// Latest published state.
    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    /// Wait until the state satisfies `pred`. Returns `None` if the flow
    /// ended without ever reaching such a state.
    pub async fn wait_for(&mut self, pred: impl FnMut(&FlowState) -> bool) -> Option<FlowState> {
        let state = self
            .state
            .wait_for(pred)
            .await
            .ok()
            .map(|s| FlowState::clone(&s));
        state
    }

    /// Abort the flow. A redirect that has not fired yet never will.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("verification flow cancelled");
        }
    }

    /// Wait for the flow to finish. `None` if it was cancelled.
    pub async fn join(mut self) -> Option<Destination> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for FlowHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

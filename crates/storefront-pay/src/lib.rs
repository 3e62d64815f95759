//! Payment verification for the storefront.
//!
//! When the payment gateway sends the customer back to the store with a
//! transaction `reference`, [`PaymentVerificationFlow`] confirms it with the
//! backend, retries transient failures, marks cached order and cart state
//! stale on success and routes the customer to a success or failure page.
//!
//! # Collaborators
//!
//! - [`VerifyBackend`]: confirms a reference ([`HttpVerifyBackend`] over HTTP)
//! - [`Navigator`]: moves the customer to a [`Destination`]
//! - [`QueryCache`]: keyed response cache with in-flight coalescing
//! - [`AuthState`]: watchable session status
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront_pay::{
//!     AuthState, AuthStatus, HttpVerifyBackend, LogNavigator, PaymentVerificationFlow, QueryCache,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = HttpVerifyBackend::with_defaults("https://api.shop.example")
//!     .unwrap()
//!     .with_auth_token("session-token");
//! let flow = PaymentVerificationFlow::new(
//!     Arc::new(backend),
//!     Arc::new(LogNavigator),
//!     Arc::new(QueryCache::new()),
//!     AuthState::new(AuthStatus::Authenticated),
//! );
//!
//! let handle = flow.mount("https://shop.example/payment/verify?reference=ps_123");
//! let destination = handle.join().await;
//! println!("sent to {destination:?}");
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod navigate;
pub mod outcome;
pub mod query;
pub mod request;
pub mod response;
pub mod retry;

pub use auth::{AuthState, AuthStatus};
pub use client::{HttpVerifyBackend, VerifyBackend};
pub use constants::*;
pub use error::{FailureKind, VerifyError};
pub use flow::{FlowHandle, FlowState, PaymentVerificationFlow};
pub use navigate::{Destination, LogNavigator, Navigator, RecordingNavigator};
pub use outcome::{classify, VerificationOutcome};
pub use query::{CachedEntry, QueryCache, QueryKey};
pub use request::VerificationRequest;
pub use response::{ApiErrorBody, TransactionRecord, VerificationResult};
pub use retry::{with_retry, RetryPolicy};

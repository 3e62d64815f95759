pub mod config;

use std::sync::Arc;

use storefront_pay::{
    AuthState, AuthStatus, Destination, HttpVerifyBackend, LogNavigator, PaymentVerificationFlow,
    QueryCache, VerifyError,
};

pub use config::{ConfigError, VerifierConfig};

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] VerifyError),

    #[error("verification flow was aborted")]
    Aborted,
}

/// Build a flow against the configured backend. Signed in iff a session
/// token is configured.
pub fn build_flow(
    config: &VerifierConfig,
) -> Result<PaymentVerificationFlow<HttpVerifyBackend, LogNavigator>, VerifierError> {
    let mut backend = HttpVerifyBackend::new(config.api_url.clone(), config.request_timeout)?;
    let auth = match config.auth_token {
        Some(ref token) => {
            backend = backend.with_auth_token(token.clone());
            AuthStatus::Authenticated
        }
        None => AuthStatus::Unauthenticated,
    };

    Ok(PaymentVerificationFlow::new(
        Arc::new(backend),
        Arc::new(LogNavigator),
        Arc::new(QueryCache::new()),
        AuthState::new(auth),
    )
    .with_config(config.flow_config()))
}

/// Run the verification flow for one gateway callback URL and return where
/// the customer was sent.
pub async fn verify_callback(
    config: &VerifierConfig,
    callback_url: &str,
) -> Result<Destination, VerifierError> {
    let flow = build_flow(config)?;
    tracing::debug!(config = ?config, callback_url = %callback_url, "starting verification");
    flow.mount(callback_url)
        .join()
        .await
        .ok_or(VerifierError::Aborted)
}

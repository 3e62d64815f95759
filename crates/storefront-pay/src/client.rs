//! Backend seam for confirming gateway references.

use std::time::Duration;

use crate::constants::{DEFAULT_REQUEST_TIMEOUT, VERIFY_PATH};
use crate::error::VerifyError;
use crate::response::{ApiErrorBody, VerificationResult};

/// Confirms a gateway reference with the payment backend.
///
/// One call is one attempt; retrying is the caller's job.
pub trait VerifyBackend: Send + Sync + 'static {
    fn verify(
        &self,
        reference: &str,
    ) -> impl std::future::Future<Output = Result<VerificationResult, VerifyError>> + Send;
}

/// [`VerifyBackend`] over HTTP: `GET {base_url}/api/payments/verify/{reference}`.
pub struct HttpVerifyBackend {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpVerifyBackend {
    /// Build a backend with its own client. Redirects are not followed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| VerifyError::Client(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(http, base_url))
    }

    /// Build a backend with the default request timeout.
    pub fn with_defaults(base_url: impl Into<String>) -> Result<Self, VerifyError> {
        Self::new(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a backend with a custom reqwest::Client.
    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// URL for confirming `reference`, which is encoded as one path segment.
    pub fn verify_url(&self, reference: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            VERIFY_PATH,
            urlencoding::encode(reference)
        )
    }
}

impl VerifyBackend for HttpVerifyBackend {
    async fn verify(&self, reference: &str) -> Result<VerificationResult, VerifyError> {
        let url = self.verify_url(reference);

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| VerifyError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(ApiErrorBody::into_reason);
            tracing::warn!(
                reference = %reference,
                status = status.as_u16(),
                reason = reason.as_deref().unwrap_or(""),
                "payment backend rejected verification request"
            );
            return Err(VerifyError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| VerifyError::Transport(format!("failed to read response body: {e}")))?;

        Ok(serde_json::from_slice(&body)?)
    }
}

use thiserror::Error;

/// Errors returned while confirming a payment reference with the backend.
///
/// Cloneable so a single in-flight confirmation can hand the same error to
/// every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}")]
    Status {
        status: u16,
        /// `userMessage` or `error` from the response body, when present.
        reason: Option<String>,
    },

    #[error("invalid verification response: {0}")]
    Decode(String),

    #[error("http client error: {0}")]
    Client(String),
}

impl VerifyError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Connection failures and backend-side statuses (5xx, 408, 429) are
    /// retryable. Client errors and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            VerifyError::Transport(_) => true,
            VerifyError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            VerifyError::Decode(_) | VerifyError::Client(_) => false,
        }
    }

    /// Human-readable reason supplied by the backend, if any.
    pub fn backend_reason(&self) -> Option<&str> {
        match self {
            VerifyError::Status {
                reason: Some(reason),
                ..
            } => Some(reason.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for VerifyError {
    fn from(e: serde_json::Error) -> Self {
        VerifyError::Decode(e.to_string())
    }
}

/// Why a verification did not end on the success page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No reference in the callback URL. Routes home silently.
    MissingReference,
    /// Caller not signed in. Routes home.
    Unauthenticated,
    /// The confirmation request never produced a usable answer: network
    /// failure or backend-side status, after retries.
    Transport,
    /// The backend refused the request with a client status (4xx other than
    /// 408/429). Not retried.
    RequestRejected,
    /// The backend answered, but without a verdict the flow can act on.
    MalformedResponse,
    /// The backend explicitly rejected the payment.
    VerificationFailed,
}

impl FailureKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingReference => "missing_reference",
            FailureKind::Unauthenticated => "unauthenticated",
            FailureKind::Transport => "transport_error",
            FailureKind::RequestRejected => "request_rejected",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::VerificationFailed => "verification_failed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

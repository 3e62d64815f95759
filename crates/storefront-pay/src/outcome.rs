//! Maps a confirmation result onto the verdict the flow acts on.

use crate::constants::{SUPPORT_REASON, UNEXPECTED_RESULT_REASON};
use crate::error::{FailureKind, VerifyError};
use crate::response::VerificationResult;

/// Terminal verdict for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified { order_id: String },
    Rejected { kind: FailureKind, reason: String },
}

impl VerificationOutcome {
    fn rejected(kind: FailureKind, reason: impl Into<String>) -> Self {
        VerificationOutcome::Rejected {
            kind,
            reason: reason.into(),
        }
    }
}

/// Classify the (already retried) confirmation result.
///
/// - `verified` with an order id is the only success.
/// - `verified = false` with a message is a business rejection; the message
///   is passed through verbatim.
/// - Anything else the backend answered is malformed.
/// - Client statuses the backend will not change its mind on are request
///   rejections; every other error is a transport failure. Both surface the
///   backend's own reason when it sent one.
pub fn classify(result: Result<VerificationResult, VerifyError>) -> VerificationOutcome {
    match result {
        Ok(VerificationResult {
            verified: true,
            order_id,
            ..
        }) => match order_id.filter(|id| !id.trim().is_empty()) {
            Some(order_id) => VerificationOutcome::Verified { order_id },
            None => VerificationOutcome::rejected(
                FailureKind::MalformedResponse,
                UNEXPECTED_RESULT_REASON,
            ),
        },
        Ok(VerificationResult { message, .. }) => match message.filter(|m| !m.is_empty()) {
            Some(message) => VerificationOutcome::rejected(FailureKind::VerificationFailed, message),
            None => VerificationOutcome::rejected(
                FailureKind::MalformedResponse,
                UNEXPECTED_RESULT_REASON,
            ),
        },
        Err(VerifyError::Decode(_)) => {
            VerificationOutcome::rejected(FailureKind::MalformedResponse, UNEXPECTED_RESULT_REASON)
        }
        Err(err) => {
            let kind = match err {
                VerifyError::Status { .. } if !err.is_retryable() => FailureKind::RequestRejected,
                _ => FailureKind::Transport,
            };
            let reason = err.backend_reason().unwrap_or(SUPPORT_REASON).to_string();
            VerificationOutcome::rejected(kind, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(verified: bool, message: Option<&str>, order_id: Option<&str>) -> VerificationResult {
        VerificationResult {
            verified,
            message: message.map(str::to_string),
            order_id: order_id.map(str::to_string),
            transaction: None,
        }
    }

    #[test]
    fn test_verified_with_order_id() {
        let outcome = classify(Ok(result(true, Some("ok"), Some("O1"))));
        assert_eq!(
            outcome,
            VerificationOutcome::Verified {
                order_id: "O1".into()
            }
        );
    }

    #[test]
    fn test_verified_without_message_still_succeeds() {
        let outcome = classify(Ok(result(true, None, Some("O1"))));
        assert!(matches!(outcome, VerificationOutcome::Verified { .. }));
    }

    #[test]
    fn test_verified_without_order_id_is_malformed() {
        let outcome = classify(Ok(result(true, Some("ok"), None)));
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::MalformedResponse,
                reason: UNEXPECTED_RESULT_REASON.into(),
            }
        );
    }

    #[test]
    fn test_rejection_message_passed_verbatim() {
        let outcome = classify(Ok(result(false, Some("card declined"), None)));
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::VerificationFailed,
                reason: "card declined".into(),
            }
        );
    }

    #[test]
    fn test_rejection_without_message_is_malformed() {
        for message in [None, Some("")] {
            let outcome = classify(Ok(result(false, message, None)));
            assert_eq!(
                outcome,
                VerificationOutcome::Rejected {
                    kind: FailureKind::MalformedResponse,
                    reason: UNEXPECTED_RESULT_REASON.into(),
                }
            );
        }
    }

    #[test]
    fn test_transport_error_uses_support_reason() {
        let outcome = classify(Err(VerifyError::Transport("timed out".into())));
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::Transport,
                reason: SUPPORT_REASON.into(),
            }
        );
    }

    #[test]
    fn test_status_error_prefers_backend_reason() {
        let outcome = classify(Err(VerifyError::Status {
            status: 404,
            reason: Some("Transaction not found".into()),
        }));
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::RequestRejected,
                reason: "Transaction not found".into(),
            }
        );
    }

    #[test]
    fn test_backend_side_status_stays_transport() {
        let outcome = classify(Err(VerifyError::Status {
            status: 503,
            reason: None,
        }));
        assert_eq!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::Transport,
                reason: SUPPORT_REASON.into(),
            }
        );
    }

    #[test]
    fn test_decode_error_is_malformed() {
        let outcome = classify(Err(VerifyError::Decode("expected value".into())));
        assert!(matches!(
            outcome,
            VerificationOutcome::Rejected {
                kind: FailureKind::MalformedResponse,
                ..
            }
        ));
    }
}

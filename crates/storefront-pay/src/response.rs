use serde::{Deserialize, Serialize};

/// Body of `GET /api/payments/verify/{reference}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    /// Required by the backend contract. Kept optional so a missing message
    /// can be told apart from an empty verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present only when `verified` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionRecord>,
}

/// Settled transaction attached to a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub status: String,
}

/// Error body the backend may attach to a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// `userMessage` if set, otherwise `error`. Blank strings count as absent.
    pub fn into_reason(self) -> Option<String> {
        self.user_message
            .filter(|s| !s.trim().is_empty())
            .or(self.error.filter(|s| !s.trim().is_empty()))
    }
}

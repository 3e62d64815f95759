use std::time::Duration;

use crate::retry::RetryPolicy;

/// Backend route that confirms a gateway reference. The reference is appended
/// as a single path segment.
pub const VERIFY_PATH: &str = "/api/payments/verify";

/// Query parameter the payment gateway uses to pass the reference back.
pub const REFERENCE_PARAM: &str = "reference";

/// Storefront routes the flow navigates to.
pub const HOME_PATH: &str = "/";
pub const SUCCESS_PATH: &str = "/payment/success";
pub const FAILURE_PATH: &str = "/payment/failure";

/// Extra attempts after the first failed confirmation request.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Fixed spacing between confirmation attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Pause between deciding an outcome and navigating, so the final state can paint.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Per-request timeout for the confirmation call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reason shown when the backend could not be reached after all retries.
pub const SUPPORT_REASON: &str = "Payment verification failed. Please contact support.";

/// Reason shown when the backend answered with something the flow cannot act on.
pub const UNEXPECTED_RESULT_REASON: &str = "Unexpected verification result";

/// Runtime knobs for [`PaymentVerificationFlow`](crate::PaymentVerificationFlow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    pub retry: RetryPolicy,
    pub redirect_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

use crate::constants::REFERENCE_PARAM;

/// A gateway reference captured from the callback URL.
///
/// Created once per callback and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationRequest {
    reference: String,
}

impl VerificationRequest {
    /// Wrap an already-extracted reference. Blank references are rejected.
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            reference: trimmed.to_string(),
        })
    }

    /// Extract the reference from a callback URL.
    ///
    /// Accepts absolute URLs (`https://shop.example/payment/verify?reference=abc`),
    /// paths (`/payment/verify?reference=abc`) and bare query strings
    /// (`reference=abc` or `?reference=abc`). Fragments are ignored.
    pub fn from_url(url: &str) -> Option<Self> {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None if without_fragment.contains('=') => without_fragment,
            None => return None,
        };
        Self::from_query(query)
    }

    /// Extract the reference from a query string (without the leading `?`).
    pub fn from_query(query: &str) -> Option<Self> {
        url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(name, _)| name == REFERENCE_PARAM)
            .and_then(|(_, value)| Self::new(value.into_owned()))
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl std::fmt::Display for VerificationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reference)
    }
}

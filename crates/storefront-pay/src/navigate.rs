use std::sync::Mutex;

use crate::constants::{FAILURE_PATH, HOME_PATH, SUCCESS_PATH};

/// Where the flow sends the customer once it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Home,
    Success { order_id: String },
    Failure { reason: String },
}

impl Destination {
    /// Storefront path for this destination, query values percent-encoded.
    pub fn to_path(&self) -> String {
        match self {
            Destination::Home => HOME_PATH.to_string(),
            Destination::Success { order_id } => {
                format!("{SUCCESS_PATH}?orderId={}", urlencoding::encode(order_id))
            }
            Destination::Failure { reason } => {
                format!("{FAILURE_PATH}?reason={}", urlencoding::encode(reason))
            }
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Routing capability the flow drives. Implementations must be thread-safe.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, destination: &Destination);
}

/// Navigator that only logs where it would go.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: &Destination) {
        tracing::info!(path = %destination, "navigating");
    }
}

/// Navigator that records every call, in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Destination> {
        match self.visits.lock() {
            Ok(visits) => visits.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Path of the most recent navigation.
    pub fn last_path(&self) -> Option<String> {
        self.visits().last().map(Destination::to_path)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &Destination) {
        let mut visits = match self.visits.lock() {
            Ok(v) => v,
            Err(poisoned) => {
                tracing::error!("navigator mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        visits.push(destination.clone());
    }
}

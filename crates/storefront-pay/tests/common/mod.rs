#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront_pay::{
    AuthState, AuthStatus, FlowConfig, PaymentVerificationFlow, QueryCache, RecordingNavigator,
    TransactionRecord, VerificationResult, VerifyBackend, VerifyError,
};
use tokio::time::Instant;

/// Backend that replays a fixed script of answers and records each call.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<VerificationResult, VerifyError>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<VerificationResult, VerifyError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, reference: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == reference)
            .count()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl VerifyBackend for ScriptedBackend {
    async fn verify(&self, reference: &str) -> Result<VerificationResult, VerifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((reference.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(VerifyError::Transport("script exhausted".into())))
    }
}

pub fn verified(order_id: &str) -> Result<VerificationResult, VerifyError> {
    Ok(VerificationResult {
        verified: true,
        message: Some("Payment verified".into()),
        order_id: Some(order_id.into()),
        transaction: Some(TransactionRecord {
            id: format!("T-{order_id}"),
            order_id: order_id.into(),
            amount: 4999.0,
            status: "success".into(),
        }),
    })
}

pub fn declined(message: Option<&str>) -> Result<VerificationResult, VerifyError> {
    Ok(VerificationResult {
        verified: false,
        message: message.map(str::to_string),
        order_id: None,
        transaction: None,
    })
}

pub fn transport_error() -> Result<VerificationResult, VerifyError> {
    Err(VerifyError::Transport("connection reset by peer".into()))
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub navigator: Arc<RecordingNavigator>,
    pub cache: Arc<QueryCache>,
    pub auth: AuthState,
    pub flow: PaymentVerificationFlow<ScriptedBackend, RecordingNavigator>,
}

impl Harness {
    pub fn new(backend: ScriptedBackend, auth: AuthStatus) -> Self {
        Self::with_config(backend, auth, FlowConfig::default())
    }

    pub fn with_config(backend: ScriptedBackend, auth: AuthStatus, config: FlowConfig) -> Self {
        let backend = Arc::new(backend);
        let navigator = Arc::new(RecordingNavigator::new());
        let cache = Arc::new(QueryCache::new());
        let auth = AuthState::new(auth);
        let flow = PaymentVerificationFlow::new(
            Arc::clone(&backend),
            Arc::clone(&navigator),
            Arc::clone(&cache),
            auth.clone(),
        )
        .with_config(config);
        Self {
            backend,
            navigator,
            cache,
            auth,
            flow,
        }
    }
}

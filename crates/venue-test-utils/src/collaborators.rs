//! Scripted payment gateway and recording notifier

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;
use venue_core::traits::{Notifier, PaymentGateway, PaymentIntent};
use venue_core::{AppError, AppResult};

/// A recorded charge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeCall {
    pub amount_cents: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

/// Payment gateway that replays queued outcomes
///
/// With the script exhausted every charge succeeds.
#[derive(Default)]
pub struct ScriptedPaymentGateway {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ChargeCall>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful charge returning `intent_id`
    pub fn succeed_with(&self, intent_id: &str) -> &Self {
        self.script.lock().push_back(Ok(intent_id.to_string()));
        self
    }

    /// Queue a failed charge
    pub fn fail_with(&self, message: &str) -> &Self {
        self.script.lock().push_back(Err(message.to_string()));
        self
    }

    /// Queue `n` failed charges
    pub fn fail_times(&self, n: usize, message: &str) -> &Self {
        for _ in 0..n {
            self.fail_with(message);
        }
        self
    }

    /// Hold every charge for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ChargeCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedPaymentGateway {
    async fn charge(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> AppResult<PaymentIntent> {
        self.calls.lock().push(ChargeCall {
            amount_cents,
            currency: currency.to_string(),
            metadata: metadata.clone(),
        });

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(id)) => Ok(PaymentIntent {
                id,
                status: Some("succeeded".to_string()),
            }),
            Some(Err(message)) => Err(AppError::Payment(message)),
            None => Ok(PaymentIntent {
                id: format!("pi_{}", Uuid::new_v4().simple()),
                status: Some("succeeded".to_string()),
            }),
        }
    }
}

/// A recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub channel: String,
}

/// Notifier that records what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail after recording it
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, message: &str, channel: &str) -> AppResult<()> {
        self.sent.lock().push(SentNotification {
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            channel: channel.to_string(),
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Notification("notification service down".to_string()));
        }
        Ok(())
    }
}

//! Payment retry model and backoff policy

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record that a booking's charge must be re-attempted
///
/// `attempt` counts the charge attempts that have already failed for the
/// booking, including the synchronous one made at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRetry {
    pub booking_id: Uuid,
    pub attempt: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRetry {
    /// Overall number of the charge attempt this row will trigger
    pub fn next_attempt_number(&self) -> u32 {
        self.attempt.max(0) as u32 + 1
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at <= now
    }
}

/// What to do after a charge attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Store `attempt` failed attempts and try again at `next_attempt_at`
    Retry {
        attempt: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Attempt budget spent; the booking fails terminally
    Exhausted,
}

/// Exponential backoff with a bounded total attempt count
///
/// The delay before overall attempt `n` (n >= 2) is `base_delay * 2^(n-2)`.
/// `max_attempts` counts every charge attempt, the synchronous one included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::minutes(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay between the failure of attempt `n - 1` and attempt `n`
    pub fn delay_before(&self, attempt_number: u32) -> Duration {
        let exponent = attempt_number.saturating_sub(2).min(20);
        self.base_delay * (1i32 << exponent)
    }

    /// Decide the follow-up after `failed_attempts` attempts have failed
    pub fn after_failure(&self, failed_attempts: u32, now: DateTime<Utc>) -> RetryDecision {
        if failed_attempts >= self.max_attempts {
            return RetryDecision::Exhausted;
        }

        RetryDecision::Retry {
            attempt: failed_attempts,
            next_attempt_at: now + self.delay_before(failed_attempts + 1),
        }
    }
}

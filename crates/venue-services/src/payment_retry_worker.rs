//! Payment retry worker
//!
//! Polls the retry queue on a fixed interval and re-attempts due charges.
//! Each row ends in one of: confirmed, rescheduled with backoff, failed
//! terminally, or dropped.

use crate::booking_service::charge_booking;
use crate::constants::{payment_failed_message, PAYMENT_FAILED_TITLE};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use venue_core::config::RetryConfig;
use venue_core::models::{Booking, BookingStatus, PaymentRetry, RetryDecision, RetryPolicy};
use venue_core::traits::{BookingRepository, Notifier, PaymentGateway, PaymentRetryRepository};
use venue_core::AppResult;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a single due retry was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Charge succeeded, booking confirmed
    Confirmed,
    /// Charge failed, next attempt stored
    Rescheduled {
        attempt: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Attempts exhausted, booking moved to `PAYMENT_FAILED`
    Failed,
    /// Booking could not be reloaded; row removed
    Dropped,
    /// Booking no longer awaiting payment; row removed without charging
    Skipped,
}

/// Per-tick summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryBatchReport {
    pub fetched: usize,
    pub confirmed: usize,
    pub rescheduled: usize,
    pub failed: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RetryBatchReport {
    fn record(&mut self, outcome: RetryOutcome) {
        match outcome {
            RetryOutcome::Confirmed => self.confirmed += 1,
            RetryOutcome::Rescheduled { .. } => self.rescheduled += 1,
            RetryOutcome::Failed => self.failed += 1,
            RetryOutcome::Dropped => self.dropped += 1,
            RetryOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.confirmed + self.rescheduled + self.failed + self.dropped + self.skipped
    }
}

/// Background consumer of the payment retry queue
pub struct PaymentRetryWorker {
    bookings: Arc<dyn BookingRepository>,
    retries: Arc<dyn PaymentRetryRepository>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    config: RetryConfig,
    notification_channel: String,
}

impl PaymentRetryWorker {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        retries: Arc<dyn PaymentRetryRepository>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: RetryConfig,
    ) -> Self {
        let policy = RetryPolicy::new(
            config.max_attempts,
            chrono::Duration::seconds(config.base_delay_secs as i64),
        );

        Self {
            bookings,
            retries,
            payments,
            notifier,
            policy,
            config,
            notification_channel: "in_app".to_string(),
        }
    }

    pub fn with_notification_channel(mut self, channel: impl Into<String>) -> Self {
        self.notification_channel = channel.into();
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run until `cancel` fires
    ///
    /// Batches run inside the loop body, so a slow batch delays the next
    /// tick instead of overlapping it.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.poll_interval().max(MIN_POLL_INTERVAL);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Payment retry worker started (interval {:?}, batch {})",
            period, self.config.batch_size
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Payment retry worker shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    match self.run_once(Utc::now(), &cancel).await {
                        Ok(report) if report.fetched > 0 => {
                            info!(
                                fetched = report.fetched,
                                confirmed = report.confirmed,
                                rescheduled = report.rescheduled,
                                failed = report.failed,
                                errors = report.errors,
                                "Payment retry batch processed"
                            );
                        }
                        Ok(_) => debug!("No payment retries due"),
                        Err(e) => error!("Payment retry batch failed: {}", e),
                    }
                }
            }
        }
    }

    /// Process every retry due at `now`, one at a time
    ///
    /// Per-row failures are logged and counted; only a failure to read the
    /// queue itself is returned.
    pub async fn run_once(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> AppResult<RetryBatchReport> {
        let due = self.retries.fetch_due(now, self.config.batch_size).await?;
        let mut report = RetryBatchReport {
            fetched: due.len(),
            ..Default::default()
        };

        for row in due {
            if cancel.is_cancelled() {
                debug!("Cancellation requested, leaving remaining retries for later");
                break;
            }

            let booking_id = row.booking_id;
            let attempt = row.next_attempt_number();
            match self.process(row, now).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.errors += 1;
                    error!(%booking_id, attempt, "Payment retry failed: {}", e);
                }
            }
        }

        Ok(report)
    }

    /// Resolve one due retry row
    ///
    /// `now` is the tick time; backoff counts from when the charge failed,
    /// never earlier than `now`.
    #[instrument(skip(self, row), fields(booking_id = %row.booking_id, attempt = row.next_attempt_number()))]
    pub async fn process(&self, row: PaymentRetry, now: DateTime<Utc>) -> AppResult<RetryOutcome> {
        let booking_id = row.booking_id;
        let attempt = row.next_attempt_number();

        let booking = match self.bookings.find_by_id(booking_id).await {
            Ok(Some(booking)) => booking,
            Ok(None) => {
                warn!("Booking {} no longer exists, dropping retry", booking_id);
                self.retries.delete(booking_id).await?;
                return Ok(RetryOutcome::Dropped);
            }
            Err(e) => {
                warn!("Failed to reload booking {}, dropping retry: {}", booking_id, e);
                self.retries.delete(booking_id).await?;
                return Ok(RetryOutcome::Dropped);
            }
        };

        if booking.status != BookingStatus::PaymentRetry {
            info!(
                "Booking {} is {}, dropping retry without charging",
                booking_id, booking.status
            );
            self.retries.delete(booking_id).await?;
            return Ok(RetryOutcome::Skipped);
        }

        match charge_booking(
            self.payments.as_ref(),
            &booking,
            Some(attempt),
            self.config.charge_timeout(),
        )
        .await
        {
            Ok(intent) => {
                // The charge went through; the row must not be charged again.
                let confirmed = self
                    .bookings
                    .update_status(booking_id, BookingStatus::Confirmed, Some(&intent.id))
                    .await;
                self.retries.delete(booking_id).await?;

                match confirmed {
                    Ok(_) => {
                        info!(intent = %intent.id, "Payment retry succeeded, booking confirmed");
                        Ok(RetryOutcome::Confirmed)
                    }
                    Err(e) => {
                        error!(
                            intent = %intent.id,
                            "Charge succeeded but booking {} could not be confirmed: {}",
                            booking_id, e
                        );
                        Err(e)
                    }
                }
            }
            Err(e) => {
                let last_error = e.to_string();
                warn!("Charge attempt {} for booking {} failed: {}", attempt, booking_id, last_error);

                let failed_at = now.max(Utc::now());
                match self.policy.after_failure(attempt, failed_at) {
                    RetryDecision::Retry {
                        attempt,
                        next_attempt_at,
                    } => {
                        self.retries
                            .schedule(booking_id, next_attempt_at, attempt as i32, &last_error)
                            .await?;
                        debug!(%next_attempt_at, "Payment retry rescheduled");
                        Ok(RetryOutcome::Rescheduled {
                            attempt,
                            next_attempt_at,
                        })
                    }
                    RetryDecision::Exhausted => {
                        mark_payment_failed(
                            self.bookings.as_ref(),
                            self.retries.as_ref(),
                            self.notifier.as_ref(),
                            &self.notification_channel,
                            &booking,
                            &last_error,
                        )
                        .await?;
                        Ok(RetryOutcome::Failed)
                    }
                }
            }
        }
    }
}

/// Fail a booking terminally, drop its retry row, and tell the user
///
/// The notification is best-effort.
pub(crate) async fn mark_payment_failed(
    bookings: &dyn BookingRepository,
    retries: &dyn PaymentRetryRepository,
    notifier: &dyn Notifier,
    channel: &str,
    booking: &Booking,
    last_error: &str,
) -> AppResult<Booking> {
    let failed = bookings
        .update_status(booking.id, BookingStatus::PaymentFailed, None)
        .await?;
    retries.delete(booking.id).await?;

    warn!(booking_id = %booking.id, "Payment attempts exhausted, booking failed");

    let message = payment_failed_message(&booking.id, last_error);
    if let Err(e) = notifier
        .notify(booking.user_id, PAYMENT_FAILED_TITLE, &message, channel)
        .await
    {
        warn!(booking_id = %booking.id, user_id = %booking.user_id, "Failed to send payment failure notification: {}", e);
    }

    Ok(failed)
}

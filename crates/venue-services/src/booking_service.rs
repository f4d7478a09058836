//! Booking orchestrator
//!
//! Validates a booking request, prices it, reserves the slot, and makes one
//! synchronous charge attempt. A failed charge does not fail the request:
//! the slot stays reserved and the booking is handed to the retry queue.

use crate::constants::{META_BOOKING_ID, META_FACILITY_ID, META_RETRY_ATTEMPT};
use crate::payment_retry_worker::mark_payment_failed;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use venue_core::config::BookingConfig;
use venue_core::models::{
    Booking, BookingFilter, BookingStatus, NewBooking, Requester, RetryDecision, RetryPolicy,
};
use venue_core::traits::{
    BookingRepository, FacilityRepository, Notifier, Pagination, PaymentGateway, PaymentIntent,
    PaymentRetryRepository,
};
use venue_core::{AppError, AppResult};

/// Inbound booking request
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub facility_id: Uuid,
    /// Subject of the booking; defaults to the requester
    pub user_id: Option<Uuid>,
    /// RFC 3339 timestamp
    pub starts_at: String,
    /// RFC 3339 timestamp
    pub ends_at: String,
}

/// Result of a booking creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Charged synchronously
    Confirmed(Booking),
    /// Slot held, charge queued for retry
    PaymentPending(Booking),
    /// Slot released, no retries left
    PaymentFailed(Booking),
}

impl BookingOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            BookingOutcome::Confirmed(b)
            | BookingOutcome::PaymentPending(b)
            | BookingOutcome::PaymentFailed(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            BookingOutcome::Confirmed(b)
            | BookingOutcome::PaymentPending(b)
            | BookingOutcome::PaymentFailed(b) => b,
        }
    }
}

/// Booking orchestration service
pub struct BookingService {
    facilities: Arc<dyn FacilityRepository>,
    bookings: Arc<dyn BookingRepository>,
    retries: Arc<dyn PaymentRetryRepository>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    config: BookingConfig,
    notification_channel: String,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(
        facilities: Arc<dyn FacilityRepository>,
        bookings: Arc<dyn BookingRepository>,
        retries: Arc<dyn PaymentRetryRepository>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            facilities,
            bookings,
            retries,
            payments,
            notifier,
            policy: RetryPolicy::default(),
            config: BookingConfig::default(),
            notification_channel: "in_app".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: BookingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_notification_channel(mut self, channel: impl Into<String>) -> Self {
        self.notification_channel = channel.into();
        self
    }

    /// Parse a request timestamp, keeping the caller's offset
    fn parse_instant(field: &str, raw: &str) -> AppResult<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
            AppError::InvalidInput(format!("{} must be an RFC 3339 timestamp: {}", field, e))
        })
    }

    /// Reject empty, inverted, and overlong intervals
    fn validate_interval(
        &self,
        start: &DateTime<FixedOffset>,
        end: &DateTime<FixedOffset>,
    ) -> AppResult<()> {
        if end <= start {
            return Err(AppError::Validation(
                "endsAt must be after startsAt".to_string(),
            ));
        }

        let max = Duration::hours(self.config.max_duration_hours);
        if *end - *start > max {
            return Err(AppError::Validation(format!(
                "booking may not exceed {} hours",
                self.config.max_duration_hours
            )));
        }

        Ok(())
    }

    /// Create a booking
    ///
    /// Returns `BookingConflict` when the slot is taken. A failed charge is
    /// reported through the outcome, not as an error.
    #[instrument(skip(self, request), fields(facility_id = %request.facility_id, requester = %requester.user_id))]
    pub async fn create_booking(
        &self,
        requester: &Requester,
        request: BookingRequest,
    ) -> AppResult<BookingOutcome> {
        if !requester.can_write_bookings() {
            warn!("User {} may not create bookings", requester.user_id);
            return Err(AppError::Forbidden);
        }
        let elevated = requester.is_elevated();

        let facility = self
            .facilities
            .find_by_id(request.facility_id)
            .await?
            .ok_or_else(|| AppError::FacilityNotFound(request.facility_id.to_string()))?;

        if !facility.available && !elevated {
            return Err(AppError::FacilityUnavailable(facility.id.to_string()));
        }

        let user_id = request.user_id.unwrap_or(requester.user_id);
        if !requester.can_act_for(user_id) {
            warn!("User {} tried to book for {}", requester.user_id, user_id);
            return Err(AppError::Forbidden);
        }

        let start = Self::parse_instant("startsAt", &request.starts_at)?;
        let end = Self::parse_instant("endsAt", &request.ends_at)?;
        self.validate_interval(&start, &end)?;

        let amount_cents = facility.price(&start, &end);
        debug!("Priced {} - {} at {} {}", start, end, amount_cents, facility.currency);

        let mut booking = self
            .bookings
            .create_booking(&NewBooking {
                facility_id: facility.id,
                user_id,
                starts_at: start.with_timezone(&Utc),
                ends_at: end.with_timezone(&Utc),
                amount_cents,
                currency: facility.currency.clone(),
            })
            .await?;

        let charged = charge_booking(
            self.payments.as_ref(),
            &booking,
            None,
            self.config.charge_timeout(),
        )
        .await;

        let outcome = match charged {
            Ok(intent) => {
                info!(booking_id = %booking.id, intent = %intent.id, "Booking confirmed");
                booking = self
                    .bookings
                    .update_status(booking.id, BookingStatus::Confirmed, Some(&intent.id))
                    .await?;
                booking.facility = Some(facility);
                BookingOutcome::Confirmed(booking)
            }
            Err(e) => {
                warn!(booking_id = %booking.id, attempt = 1, "Initial charge failed: {}", e);
                let mut updated = self.hand_off_to_retry(booking, &e.to_string()).await?;
                updated.facility = Some(facility);
                if updated.status == BookingStatus::PaymentFailed {
                    BookingOutcome::PaymentFailed(updated)
                } else {
                    BookingOutcome::PaymentPending(updated)
                }
            }
        };

        Ok(outcome)
    }

    /// Park a booking whose first charge failed
    ///
    /// When the retry row cannot be written the booking is cancelled before
    /// the error is returned.
    async fn hand_off_to_retry(&self, booking: Booking, last_error: &str) -> AppResult<Booking> {
        let updated = self
            .bookings
            .update_status(booking.id, BookingStatus::PaymentRetry, None)
            .await?;

        match self.policy.after_failure(1, Utc::now()) {
            RetryDecision::Retry {
                attempt,
                next_attempt_at,
            } => {
                if let Err(e) = self
                    .retries
                    .schedule(booking.id, next_attempt_at, attempt as i32, last_error)
                    .await
                {
                    error!(booking_id = %booking.id, "Failed to schedule payment retry: {}", e);
                    self.release_slot(booking.id).await;
                    return Err(e);
                }
                info!(
                    booking_id = %booking.id,
                    attempt,
                    %next_attempt_at,
                    "Payment retry scheduled"
                );
                Ok(updated)
            }
            RetryDecision::Exhausted => {
                mark_payment_failed(
                    self.bookings.as_ref(),
                    self.retries.as_ref(),
                    self.notifier.as_ref(),
                    &self.notification_channel,
                    &updated,
                    last_error,
                )
                .await
            }
        }
    }

    /// Cancel a booking nothing will ever settle, so its slot can be booked again
    async fn release_slot(&self, booking_id: Uuid) {
        match self.bookings.cancel(booking_id).await {
            Ok(_) => warn!(%booking_id, "Released slot of booking without a scheduled retry"),
            Err(e) => error!(%booking_id, "Failed to release slot: {}", e),
        }
    }

    /// Fetch a booking visible to `requester`
    #[instrument(skip(self))]
    pub async fn get_booking(&self, requester: &Requester, id: Uuid) -> AppResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

        if !requester.can_act_for(booking.user_id) {
            return Err(AppError::Forbidden);
        }

        Ok(booking)
    }

    /// List bookings; non-elevated callers only see their own
    #[instrument(skip(self))]
    pub async fn list_bookings(
        &self,
        requester: &Requester,
        mut filter: BookingFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<Booking>> {
        if !requester.is_elevated() {
            match filter.user_id {
                Some(user_id) if user_id != requester.user_id => return Err(AppError::Forbidden),
                _ => filter.user_id = Some(requester.user_id),
            }
        }

        self.bookings.list(&filter, pagination).await
    }

    /// Cancel a booking and drop any pending retry
    ///
    /// Cancelling twice returns the cancelled booking unchanged.
    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, requester: &Requester, id: Uuid) -> AppResult<Booking> {
        if !requester.can_write_bookings() {
            return Err(AppError::Forbidden);
        }
        let booking = self.get_booking(requester, id).await?;
        let cancelled = self.bookings.cancel(booking.id).await?;
        self.retries.delete(booking.id).await?;

        info!(booking_id = %id, "Booking cancelled by {}", requester.user_id);
        Ok(cancelled)
    }
}

/// Charge metadata for a booking; `attempt` is set on scheduled retries
pub(crate) fn charge_metadata(booking: &Booking, attempt: Option<u32>) -> HashMap<String, String> {
    let mut metadata = HashMap::from([
        (META_BOOKING_ID.to_string(), booking.id.to_string()),
        (META_FACILITY_ID.to_string(), booking.facility_id.to_string()),
    ]);
    if let Some(attempt) = attempt {
        metadata.insert(META_RETRY_ATTEMPT.to_string(), attempt.to_string());
    }
    metadata
}

/// One bounded charge attempt for `booking`
pub(crate) async fn charge_booking(
    payments: &dyn PaymentGateway,
    booking: &Booking,
    attempt: Option<u32>,
    timeout: StdDuration,
) -> AppResult<PaymentIntent> {
    let metadata = charge_metadata(booking, attempt);
    match tokio::time::timeout(
        timeout,
        payments.charge(booking.amount_cents, &booking.currency, &metadata),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(AppError::PaymentTimeout(timeout.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use venue_core::models::Role;
    use venue_test_utils::{new_facility, InMemoryBackend, RecordingNotifier, ScriptedPaymentGateway};

    mock! {
        Gateway {}

        #[async_trait]
        impl PaymentGateway for Gateway {
            async fn charge(
                &self,
                amount_cents: i64,
                currency: &str,
                metadata: &HashMap<String, String>,
            ) -> AppResult<PaymentIntent>;
        }
    }

    struct Harness {
        backend: InMemoryBackend,
        gateway: Arc<ScriptedPaymentGateway>,
        notifier: Arc<RecordingNotifier>,
        service: BookingService,
    }

    fn harness() -> Harness {
        let backend = InMemoryBackend::new();
        let gateway = Arc::new(ScriptedPaymentGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = BookingService::new(
            backend.facilities.clone(),
            backend.bookings.clone(),
            backend.retries.clone(),
            gateway.clone(),
            notifier.clone(),
        );
        Harness {
            backend,
            gateway,
            notifier,
            service,
        }
    }

    fn request(facility_id: Uuid, start: &str, end: &str) -> BookingRequest {
        BookingRequest {
            facility_id,
            user_id: None,
            starts_at: start.to_string(),
            ends_at: end.to_string(),
        }
    }

    #[tokio::test]
    async fn test_confirmed_on_successful_charge() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        h.gateway.succeed_with("pi_123");
        let member = Requester::member(Uuid::new_v4());

        let outcome = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:30:00Z"))
            .await
            .unwrap();

        let booking = match outcome {
            BookingOutcome::Confirmed(b) => b,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(booking.amount_cents, 9000);
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_intent.as_deref(), Some("pi_123"));
        assert_eq!(booking.user_id, member.user_id);
        assert_eq!(booking.facility.as_ref().map(|f| f.id), Some(f.id));
        assert!(h.backend.retries.is_empty());

        let calls = h.gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].currency, "CAD");
        assert_eq!(calls[0].metadata[META_BOOKING_ID], booking.id.to_string());
        assert!(!calls[0].metadata.contains_key(META_RETRY_ATTEMPT));
    }

    #[tokio::test]
    async fn test_failed_charge_holds_slot_and_schedules_retry() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        h.gateway.fail_with("card declined");
        let member = Requester::member(Uuid::new_v4());

        let before = Utc::now();
        let outcome = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:30:00Z"))
            .await
            .unwrap();

        let booking = match outcome {
            BookingOutcome::PaymentPending(b) => b,
            other => panic!("expected pending payment, got {:?}", other),
        };
        assert_eq!(booking.status, BookingStatus::PaymentRetry);

        let retry = h.backend.retries.find(booking.id).await.unwrap().unwrap();
        assert_eq!(retry.attempt, 1);
        assert_eq!(retry.last_error, "Payment failed: card declined");
        assert!(retry.next_attempt_at >= before + Duration::minutes(1));
        assert!(retry.next_attempt_at <= Utc::now() + Duration::minutes(1));

        // Slot is still held
        let clash = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T10:00:00Z", "2024-07-01T11:00:00Z"))
            .await;
        assert!(matches!(clash, Err(AppError::BookingConflict { .. })));
    }

    #[tokio::test]
    async fn test_single_attempt_policy_fails_immediately() {
        let h = harness();
        let service = h.service.with_policy(RetryPolicy::new(1, Duration::minutes(1)));
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        h.gateway.fail_with("declined");
        let member = Requester::member(Uuid::new_v4());

        let outcome = service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap();

        assert!(matches!(outcome, BookingOutcome::PaymentFailed(_)));
        assert!(h.backend.retries.is_empty());
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_intervals() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let member = Requester::member(Uuid::new_v4());

        let malformed = h
            .service
            .create_booking(&member, request(f.id, "tomorrow", "2024-07-01T10:00:00Z"))
            .await;
        assert!(matches!(malformed, Err(AppError::InvalidInput(_))));

        let inverted = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T10:00:00Z", "2024-07-01T09:00:00Z"))
            .await;
        assert!(matches!(inverted, Err(AppError::Validation(_))));

        let overlong = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T10:00:00Z", "2024-07-02T10:00:01Z"))
            .await;
        assert!(matches!(overlong, Err(AppError::Validation(_))));

        assert_eq!(h.gateway.call_count(), 0);
        assert!(h.backend.bookings.all().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_facility_needs_elevation() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        h.backend.facilities.set_availability(f.id, false).await.unwrap();

        let member = Requester::member(Uuid::new_v4());
        let denied = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await;
        assert!(matches!(denied, Err(AppError::FacilityUnavailable(_))));

        let admin = Requester::new(Uuid::new_v4(), vec![Role::VenueAdmin]);
        let allowed = h
            .service
            .create_booking(&admin, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await;
        assert!(allowed.is_ok());
    }

    #[tokio::test]
    async fn test_booking_for_someone_else() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let other = Uuid::new_v4();
        let mut req = request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z");
        req.user_id = Some(other);

        let member = Requester::member(Uuid::new_v4());
        let denied = h.service.create_booking(&member, req.clone()).await;
        assert!(matches!(denied, Err(AppError::Forbidden)));

        let admin = Requester::new(Uuid::new_v4(), vec![Role::Admin]);
        let booking = h.service.create_booking(&admin, req).await.unwrap().into_booking();
        assert_eq!(booking.user_id, other);
    }

    #[tokio::test]
    async fn test_missing_facility() {
        let h = harness();
        let member = Requester::member(Uuid::new_v4());
        let result = h
            .service
            .create_booking(
                &member,
                request(Uuid::new_v4(), "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"),
            )
            .await;
        assert!(matches!(result, Err(AppError::FacilityNotFound(_))));
    }

    #[tokio::test]
    async fn test_weekend_price_uses_local_start_day() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let member = Requester::member(Uuid::new_v4());

        // Friday evening in Toronto, already Saturday in UTC
        let booking = h
            .service
            .create_booking(
                &member,
                request(f.id, "2024-07-05T21:00:00-04:00", "2024-07-05T22:00:00-04:00"),
            )
            .await
            .unwrap()
            .into_booking();
        assert_eq!(booking.amount_cents, 4500);
        assert_eq!(booking.starts_at, venue_test_utils::at("2024-07-06T01:00:00Z"));
    }

    #[tokio::test]
    async fn test_slow_charge_times_out_into_retry() {
        let h = harness();
        let service = h.service.with_config(BookingConfig {
            max_duration_hours: 24,
            charge_timeout_secs: 0,
        });
        h.gateway.set_delay(StdDuration::from_millis(50));
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let member = Requester::member(Uuid::new_v4());

        let outcome = service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(outcome, BookingOutcome::PaymentPending(_)));

        let retry = h.backend.retries.find(outcome.booking().id).await.unwrap().unwrap();
        assert!(retry.last_error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_charge_metadata_with_mock_gateway() {
        let backend = InMemoryBackend::new();
        let f = backend.facilities.create(&new_facility("Court")).await.unwrap();
        let facility_id = f.id.to_string();

        let mut gateway = MockGateway::new();
        gateway
            .expect_charge()
            .withf(move |amount, currency, metadata| {
                *amount == 4500
                    && currency == "CAD"
                    && metadata.get(META_FACILITY_ID) == Some(&facility_id)
                    && metadata.contains_key(META_BOOKING_ID)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(PaymentIntent {
                    id: "pi_mock".to_string(),
                    status: None,
                })
            });

        let service = BookingService::new(
            backend.facilities.clone(),
            backend.bookings.clone(),
            backend.retries.clone(),
            Arc::new(gateway),
            Arc::new(RecordingNotifier::new()),
        );

        let outcome = service
            .create_booking(
                &Requester::member(Uuid::new_v4()),
                request(f.id, "2024-07-02T09:00:00Z", "2024-07-02T10:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.booking().payment_intent.as_deref(), Some("pi_mock"));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_drops_retry() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        h.gateway.fail_with("declined");
        let member = Requester::member(Uuid::new_v4());

        let booking = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:30:00Z"))
            .await
            .unwrap()
            .into_booking();
        assert_eq!(h.backend.retries.len(), 1);

        let first = h.service.cancel_booking(&member, booking.id).await.unwrap();
        let second = h.service.cancel_booking(&member, booking.id).await.unwrap();

        assert_eq!(first.status, BookingStatus::Cancelled);
        assert_eq!(second.status, BookingStatus::Cancelled);
        assert_eq!(second.amount_cents, booking.amount_cents);
        assert_eq!(second.facility_id, booking.facility_id);
        assert_eq!(second.starts_at, booking.starts_at);
        assert_eq!(second.ends_at, booking.ends_at);
        assert!(h.backend.retries.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_confirmed_is_rejected() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let member = Requester::member(Uuid::new_v4());
        let booking = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap()
            .into_booking();

        let result = h.service.cancel_booking(&member, booking.id).await;
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_access_rules() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let owner = Requester::member(Uuid::new_v4());
        let stranger = Requester::member(Uuid::new_v4());
        let admin = Requester::new(Uuid::new_v4(), vec![Role::Admin]);

        let booking = h
            .service
            .create_booking(&owner, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap()
            .into_booking();

        assert!(h.service.get_booking(&owner, booking.id).await.is_ok());
        assert!(h.service.get_booking(&admin, booking.id).await.is_ok());
        assert!(matches!(
            h.service.get_booking(&stranger, booking.id).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            h.service.cancel_booking(&stranger, booking.id).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            h.service.get_booking(&owner, Uuid::new_v4()).await,
            Err(AppError::BookingNotFound(_))
        ));

        let own = h
            .service
            .list_bookings(&stranger, BookingFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert!(own.is_empty());

        let spying = h
            .service
            .list_bookings(
                &stranger,
                BookingFilter {
                    user_id: Some(owner.user_id),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await;
        assert!(matches!(spying, Err(AppError::Forbidden)));

        let all = h
            .service
            .list_bookings(&admin, BookingFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_retry_queue_releases_slot() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let member = Requester::member(Uuid::new_v4());
        h.gateway.fail_with("card declined");
        h.backend.retries.set_unavailable(true);

        let result = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let rows = h.backend.bookings.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, BookingStatus::Cancelled);

        // Same request goes through once the queue is back
        h.backend.retries.set_unavailable(false);
        h.gateway.succeed_with("pi_again");
        let outcome = h
            .service
            .create_booking(&member, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(outcome, BookingOutcome::Confirmed(_)));
    }

    #[tokio::test]
    async fn test_operator_is_read_only() {
        let h = harness();
        let f = h.backend.facilities.create(&new_facility("Court")).await.unwrap();
        let owner = Requester::member(Uuid::new_v4());
        let operator = Requester::new(Uuid::new_v4(), vec![Role::Operator]);

        let denied = h
            .service
            .create_booking(&operator, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden)));
        assert!(h.backend.bookings.all().is_empty());

        h.gateway.fail_with("declined");
        let booking = h
            .service
            .create_booking(&owner, request(f.id, "2024-07-01T09:00:00Z", "2024-07-01T10:00:00Z"))
            .await
            .unwrap()
            .into_booking();

        let operator_self = Requester::new(owner.user_id, vec![Role::Operator]);
        assert!(h.service.get_booking(&operator_self, booking.id).await.is_ok());
        assert!(matches!(
            h.service.cancel_booking(&operator_self, booking.id).await,
            Err(AppError::Forbidden)
        ));
        assert_eq!(h.backend.retries.len(), 1);
    }
}

//! In-memory repository implementations
//!
//! Each store keeps its rows behind a `parking_lot::Mutex`; the booking
//! store performs its overlap check and insert under one lock, which gives
//! the same all-or-nothing reservation the Postgres store gets from its
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use venue_core::models::{
    Booking, BookingFilter, BookingStatus, Facility, FacilityFilter, FacilityOverride, NewBooking,
    NewFacility, NewFacilityOverride, PaymentRetry,
};
use venue_core::traits::{
    BookingRepository, FacilityRepository, OverrideRepository, Pagination, PaymentRetryRepository,
};
use venue_core::{AppError, AppResult};

/// Facilities keyed by id
#[derive(Default)]
pub struct InMemoryFacilityRepository {
    rows: Mutex<HashMap<Uuid, Facility>>,
}

impl InMemoryFacilityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.rows.lock().contains_key(&id)
    }
}

#[async_trait]
impl FacilityRepository for InMemoryFacilityRepository {
    async fn create(&self, new: &NewFacility) -> AppResult<Facility> {
        let now = Utc::now();
        let facility = Facility {
            id: Uuid::new_v4(),
            venue_id: new.venue_id,
            name: new.name.clone(),
            description: new.description.clone(),
            surface: new.surface.clone(),
            open_at: new.open_at,
            close_at: new.close_at,
            available: true,
            weekday_rate_cents: new.weekday_rate(),
            weekend_rate_cents: new.weekend_rate(),
            currency: new.currency(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().insert(facility.id, facility.clone());
        Ok(facility)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Facility>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn list(&self, filter: &FacilityFilter, pagination: Pagination) -> AppResult<Vec<Facility>> {
        let mut rows: Vec<Facility> = self
            .rows
            .lock()
            .values()
            .filter(|f| filter.venue_id.map_or(true, |v| f.venue_id == v))
            .filter(|f| filter.available.map_or(true, |a| f.available == a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(pagination.slice(&rows))
    }

    async fn set_availability(&self, id: Uuid, available: bool) -> AppResult<Facility> {
        let mut rows = self.rows.lock();
        let facility = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::FacilityNotFound(id.to_string()))?;
        facility.available = available;
        facility.updated_at = Utc::now();
        Ok(facility.clone())
    }

    async fn ensure(&self, id: Uuid, new: &NewFacility) -> AppResult<Facility> {
        let now = Utc::now();
        let stored = self.rows.lock().entry(id).or_insert_with(|| Facility {
            id,
            venue_id: new.venue_id,
            name: new.name.clone(),
            description: new.description.clone(),
            surface: new.surface.clone(),
            open_at: new.open_at,
            close_at: new.close_at,
            available: true,
            weekday_rate_cents: new.weekday_rate(),
            weekend_rate_cents: new.weekend_rate(),
            currency: new.currency(),
            created_at: now,
            updated_at: now,
        }).clone();
        Ok(stored)
    }
}

/// Reservation store backed by a vector
#[derive(Default)]
pub struct InMemoryBookingRepository {
    rows: Mutex<Vec<Booking>>,
    facilities: Option<Arc<InMemoryFacilityRepository>>,
    failing_updates: Mutex<Vec<BookingStatus>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject reservations for facilities unknown to `facilities`
    pub fn with_facilities(facilities: Arc<InMemoryFacilityRepository>) -> Self {
        Self {
            facilities: Some(facilities),
            ..Self::default()
        }
    }

    /// Fail the next `update_status` to `status` with a storage error
    pub fn fail_next_update_to(&self, status: BookingStatus) {
        self.failing_updates.lock().push(status);
    }

    /// Drop a booking row, as if deleted out of band
    pub fn remove(&self, id: Uuid) {
        self.rows.lock().retain(|b| b.id != id);
    }

    pub fn all(&self) -> Vec<Booking> {
        self.rows.lock().clone()
    }

    fn transition(&self, id: Uuid, status: BookingStatus, payment_intent: Option<&str>) -> AppResult<Booking> {
        let mut rows = self.rows.lock();
        let booking = rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

        if !booking.status.can_transition_to(status) {
            return Err(AppError::InvalidTransition {
                from: booking.status.to_string(),
                to: status.to_string(),
            });
        }

        booking.status = status;
        if let Some(intent) = payment_intent {
            booking.payment_intent = Some(intent.to_string());
        }
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create_booking(&self, new: &NewBooking) -> AppResult<Booking> {
        if let Some(facilities) = &self.facilities {
            if !facilities.contains(new.facility_id) {
                return Err(AppError::FacilityNotFound(new.facility_id.to_string()));
            }
        }

        let mut rows = self.rows.lock();
        if rows
            .iter()
            .any(|b| b.conflicts_with(new.facility_id, new.starts_at, new.ends_at))
        {
            return Err(AppError::BookingConflict {
                facility_id: new.facility_id.to_string(),
            });
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::now_v7(),
            facility_id: new.facility_id,
            user_id: new.user_id,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            status: BookingStatus::PendingPayment,
            amount_cents: new.amount_cents,
            currency: new.currency.clone(),
            payment_intent: None,
            created_at: now,
            updated_at: now,
            facility: None,
        };
        rows.push(booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.rows.lock().iter().find(|b| b.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_intent: Option<&str>,
    ) -> AppResult<Booking> {
        {
            let mut failing = self.failing_updates.lock();
            if let Some(pos) = failing.iter().position(|s| *s == status) {
                failing.remove(pos);
                return Err(AppError::Database("bookings unavailable".to_string()));
            }
        }
        self.transition(id, status, payment_intent)
    }

    async fn cancel(&self, id: Uuid) -> AppResult<Booking> {
        {
            let rows = self.rows.lock();
            let booking = rows
                .iter()
                .find(|b| b.id == id)
                .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;
            if booking.status == BookingStatus::Cancelled {
                return Ok(booking.clone());
            }
        }
        self.transition(id, BookingStatus::Cancelled, None)
    }

    async fn list(&self, filter: &BookingFilter, pagination: Pagination) -> AppResult<Vec<Booking>> {
        let mut rows: Vec<Booking> = self
            .rows
            .lock()
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(a.id.cmp(&b.id)));
        Ok(pagination.slice(&rows))
    }
}

/// Overrides in insertion order
#[derive(Default)]
pub struct InMemoryOverrideRepository {
    rows: Mutex<Vec<FacilityOverride>>,
}

impl InMemoryOverrideRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, keep: impl Fn(&FacilityOverride) -> bool) -> Vec<FacilityOverride> {
        let mut rows: Vec<FacilityOverride> =
            self.rows.lock().iter().filter(|o| keep(o)).cloned().collect();
        // stable: insertion order breaks ties
        rows.sort_by_key(|o| o.start_date);
        rows
    }
}

#[async_trait]
impl OverrideRepository for InMemoryOverrideRepository {
    async fn create(&self, new: &NewFacilityOverride) -> AppResult<FacilityOverride> {
        let row = FacilityOverride {
            id: Uuid::new_v4(),
            facility_id: new.facility_id,
            start_date: new.start_date,
            end_date: new.end_date,
            all_day: new.all_day,
            open_at: new.open_at,
            close_at: new.close_at,
            reason: new.reason.clone(),
            weekdays: new.weekdays.clone(),
            created_at: Utc::now(),
        };
        self.rows.lock().push(row.clone());
        Ok(row)
    }

    async fn list_by_facility(&self, facility_id: Uuid) -> AppResult<Vec<FacilityOverride>> {
        Ok(self.sorted(|o| o.facility_id == facility_id))
    }

    async fn list_in_range(
        &self,
        facility_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<FacilityOverride>> {
        Ok(self.sorted(|o| o.facility_id == facility_id && o.intersects(from, to)))
    }

    async fn delete(&self, facility_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|o| !(o.id == id && o.facility_id == facility_id));
        if rows.len() == before {
            return Err(AppError::OverrideNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Retry queue keyed by booking id
#[derive(Default)]
pub struct InMemoryPaymentRetryRepository {
    rows: Mutex<HashMap<Uuid, PaymentRetry>>,
    unavailable: AtomicBool,
}

impl InMemoryPaymentRetryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a storage error until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a row's next attempt to `at`
    pub fn make_due(&self, booking_id: Uuid, at: DateTime<Utc>) {
        if let Some(row) = self.rows.lock().get_mut(&booking_id) {
            row.next_attempt_at = at;
        }
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("payment_retries unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRetryRepository for InMemoryPaymentRetryRepository {
    async fn schedule(
        &self,
        booking_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        attempt: i32,
        last_error: &str,
    ) -> AppResult<PaymentRetry> {
        self.check_available()?;
        let now = Utc::now();
        let mut rows = self.rows.lock();
        let row = rows.entry(booking_id).or_insert_with(|| PaymentRetry {
            booking_id,
            attempt,
            next_attempt_at,
            last_error: String::new(),
            created_at: now,
            updated_at: now,
        });
        row.attempt = attempt;
        row.next_attempt_at = next_attempt_at;
        row.last_error = last_error.to_string();
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<PaymentRetry>> {
        self.check_available()?;
        let mut due: Vec<PaymentRetry> = self
            .rows
            .lock()
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_attempt_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn find(&self, booking_id: Uuid) -> AppResult<Option<PaymentRetry>> {
        self.check_available()?;
        Ok(self.rows.lock().get(&booking_id).cloned())
    }

    async fn delete(&self, booking_id: Uuid) -> AppResult<()> {
        self.check_available()?;
        self.rows.lock().remove(&booking_id);
        Ok(())
    }
}

/// All in-memory stores wired together
pub struct InMemoryBackend {
    pub facilities: Arc<InMemoryFacilityRepository>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub overrides: Arc<InMemoryOverrideRepository>,
    pub retries: Arc<InMemoryPaymentRetryRepository>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let facilities = Arc::new(InMemoryFacilityRepository::new());
        Self {
            bookings: Arc::new(InMemoryBookingRepository::with_facilities(facilities.clone())),
            facilities,
            overrides: Arc::new(InMemoryOverrideRepository::new()),
            retries: Arc::new(InMemoryPaymentRetryRepository::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, new_facility};
    use chrono::Duration;

    fn new_booking(facility_id: Uuid, start: &str, minutes: i64) -> NewBooking {
        let starts_at = at(start);
        NewBooking {
            facility_id,
            user_id: Uuid::new_v4(),
            starts_at,
            ends_at: starts_at + Duration::minutes(minutes),
            amount_cents: 4500,
            currency: "CAD".to_string(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_conflict_detection() {
        let backend = InMemoryBackend::new();
        let f = backend.facilities.create(&new_facility("Court")).await.unwrap();

        backend
            .bookings
            .create_booking(&new_booking(f.id, "2024-07-01T09:00:00Z", 60))
            .await
            .unwrap();
        let clash = backend
            .bookings
            .create_booking(&new_booking(f.id, "2024-07-01T09:30:00Z", 60))
            .await;
        assert!(matches!(clash, Err(AppError::BookingConflict { .. })));

        let unknown = backend
            .bookings
            .create_booking(&new_booking(Uuid::new_v4(), "2024-07-01T09:30:00Z", 60))
            .await;
        assert!(matches!(unknown, Err(AppError::FacilityNotFound(_))));
    }

    #[tokio::test]
    async fn test_retry_queue_orders_due_rows() {
        let retries = InMemoryPaymentRetryRepository::new();
        let now = Utc::now();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        retries.schedule(a, now - Duration::minutes(1), 1, "x").await.unwrap();
        retries.schedule(b, now - Duration::minutes(3), 1, "x").await.unwrap();
        retries.schedule(c, now + Duration::minutes(3), 1, "x").await.unwrap();

        let due: Vec<Uuid> = retries
            .fetch_due(now, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.booking_id)
            .collect();
        assert_eq!(due, vec![b, a]);
        assert_eq!(retries.fetch_due(now, 1).await.unwrap().len(), 1);

        retries.set_unavailable(true);
        assert!(retries.fetch_due(now, 10).await.is_err());
    }
}

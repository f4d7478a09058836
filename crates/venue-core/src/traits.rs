//! Common traits for repositories and collaborators
//!
//! Defines abstractions for storage access and the external payment and
//! notification services.

use crate::error::AppError;
use crate::models::{
    Booking, BookingFilter, BookingStatus, Facility, FacilityFilter, FacilityOverride, NewBooking,
    NewFacility, NewFacilityOverride, PaymentRetry,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Facility storage
#[async_trait]
pub trait FacilityRepository: Send + Sync {
    async fn create(&self, facility: &NewFacility) -> Result<Facility, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Facility>, AppError>;

    /// List facilities ordered by name
    async fn list(
        &self,
        filter: &FacilityFilter,
        pagination: Pagination,
    ) -> Result<Vec<Facility>, AppError>;

    async fn set_availability(&self, id: Uuid, available: bool) -> Result<Facility, AppError>;

    /// Insert `facility` under `id` unless that id exists; return the stored row
    async fn ensure(&self, id: Uuid, facility: &NewFacility) -> Result<Facility, AppError>;
}

/// Reservation store
///
/// Owns conflict detection and every booking status change.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Reserve a slot
    ///
    /// The overlap check and the insert run as one atomic unit. Fails with
    /// `AppError::BookingConflict` when a holding booking on the same facility
    /// overlaps `[starts_at, ends_at)`.
    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Overwrite status and, when given, the payment intent
    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_intent: Option<&str>,
    ) -> Result<Booking, AppError>;

    /// Move a booking to `CANCELLED`
    ///
    /// Cancelling an already cancelled booking returns it unchanged.
    async fn cancel(&self, id: Uuid) -> Result<Booking, AppError>;

    /// List bookings ordered by start time, newest first
    async fn list(
        &self,
        filter: &BookingFilter,
        pagination: Pagination,
    ) -> Result<Vec<Booking>, AppError>;
}

/// Facility override storage
#[async_trait]
pub trait OverrideRepository: Send + Sync {
    async fn create(&self, new: &NewFacilityOverride) -> Result<FacilityOverride, AppError>;

    /// All overrides of a facility ordered by start date, then creation
    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<FacilityOverride>, AppError>;

    /// Overrides whose date range intersects `[from, to]`, same order as above
    async fn list_in_range(
        &self,
        facility_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FacilityOverride>, AppError>;

    async fn delete(&self, facility_id: Uuid, id: Uuid) -> Result<(), AppError>;
}

/// Durable payment retry queue, one row per booking
#[async_trait]
pub trait PaymentRetryRepository: Send + Sync {
    /// Insert or overwrite the retry row of a booking
    async fn schedule(
        &self,
        booking_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        attempt: i32,
        last_error: &str,
    ) -> Result<PaymentRetry, AppError>;

    /// Rows due at `now`, earliest first, at most `limit`
    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PaymentRetry>, AppError>;

    async fn find(&self, booking_id: Uuid) -> Result<Option<PaymentRetry>, AppError>;

    /// Remove the row; succeeds when there is none
    async fn delete(&self, booking_id: Uuid) -> Result<(), AppError>;
}

/// Payment intent created by the payment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub status: Option<String>,
}

/// External payment collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, AppError>;
}

/// External notification collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        channel: &str,
    ) -> Result<(), AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Non-positive limits fall back to the default; large ones are capped
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        };

        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Apply to an in-memory, already ordered sequence
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        let count = data.len();
        Self {
            data,
            pagination: PaginationMeta {
                limit: pagination.limit,
                offset: pagination.offset,
                count,
            },
        }
    }
}

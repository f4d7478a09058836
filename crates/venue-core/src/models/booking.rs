//! Booking model
//!
//! A booking reserves a facility for a half-open interval `[starts_at, ends_at)`
//! and carries the payment lifecycle of that reservation.

use super::Facility;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking status
///
/// `PendingPayment` is the initial state. `Confirmed`, `PaymentFailed` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    PaymentRetry,
    PaymentFailed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BookingStatus {
    /// Statuses that hold the slot and take part in overlap detection
    pub const HOLDING: [BookingStatus; 3] = [
        BookingStatus::PendingPayment,
        BookingStatus::Confirmed,
        BookingStatus::PaymentRetry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "PENDING_PAYMENT",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::PaymentRetry => "PAYMENT_RETRY",
            BookingStatus::PaymentFailed => "PAYMENT_FAILED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse from the stored representation (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING_PAYMENT" => Some(BookingStatus::PendingPayment),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "PAYMENT_RETRY" => Some(BookingStatus::PaymentRetry),
            "PAYMENT_FAILED" => Some(BookingStatus::PaymentFailed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// True when a booking in this status blocks overlapping bookings
    pub fn is_holding(&self) -> bool {
        Self::HOLDING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::PaymentFailed | BookingStatus::Cancelled
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// Writing the same status again is always allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (PendingPayment, PaymentRetry)
                | (PendingPayment, Cancelled)
                | (PaymentRetry, Confirmed)
                | (PaymentRetry, PaymentFailed)
                | (PaymentRetry, Cancelled)
        )
    }
}

/// Booking of a facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_intent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached on confirmation responses
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub facility: Option<Facility>,
}

impl Booking {
    /// Half-open overlap test against `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.starts_at < end && self.ends_at > start
    }

    /// True when this booking blocks `[start, end)` on its facility
    pub fn conflicts_with(&self, facility_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.facility_id == facility_id && self.status.is_holding() && self.overlaps(start, end)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Data for reserving a slot
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub facility_id: Uuid,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub currency: String,
}

/// Booking listing filter
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.map_or(true, |id| booking.user_id == id)
            && self.facility_id.map_or(true, |id| booking.facility_id == id)
            && self.status.map_or(true, |s| booking.status == s)
    }
}

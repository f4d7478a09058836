//! Booking DTOs
//!
//! Request and query types for booking endpoints. Bookings are returned
//! in their model form, which already serializes to the wire shape.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use venue_core::models::{BookingFilter, BookingStatus};
use venue_core::{AppError, AppResult};
use venue_services::BookingRequest;

/// Booking creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub facility_id: Uuid,

    /// Book on behalf of another user (elevated callers only)
    pub user_id: Option<Uuid>,

    /// RFC 3339 start instant
    #[validate(length(min = 1, message = "startsAt is required"))]
    pub starts_at: String,

    /// RFC 3339 end instant
    #[validate(length(min = 1, message = "endsAt is required"))]
    pub ends_at: String,
}

impl From<CreateBookingRequest> for BookingRequest {
    fn from(req: CreateBookingRequest) -> Self {
        BookingRequest {
            facility_id: req.facility_id,
            user_id: req.user_id,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        }
    }
}

/// Booking list filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQueryParams {
    pub user_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub status: Option<String>,
}

impl BookingQueryParams {
    pub fn to_filter(&self) -> AppResult<BookingFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                BookingStatus::from_str(raw)
                    .ok_or_else(|| AppError::InvalidInput(format!("unknown booking status: {}", raw)))?,
            ),
        };

        Ok(BookingFilter {
            user_id: self.user_id,
            facility_id: self.facility_id,
            status,
        })
    }
}

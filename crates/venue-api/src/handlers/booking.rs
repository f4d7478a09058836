//! Booking handlers
//!
//! HTTP handlers for creating, reading, listing, and cancelling bookings.

use crate::caller::Caller;
use crate::dto::{ApiResponse, BookingQueryParams, CreateBookingRequest, PaginationParams};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;
use venue_core::traits::PaginatedResponse;
use venue_core::AppError;
use venue_services::BookingOutcome;

/// Create a booking
///
/// POST /v1/bookings
///
/// Answers 201 when the charge went through and 202 when the slot is held
/// while the payment is retried.
#[instrument(skip(state, caller, req), fields(user_id = %caller.user_id))]
pub async fn create_booking(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Booking validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let outcome = state
        .bookings
        .create_booking(caller.requester(), req.into_inner().into())
        .await?;

    let response = match outcome {
        BookingOutcome::Confirmed(booking) => {
            HttpResponse::Created().json(ApiResponse::with_message(booking, "Booking confirmed"))
        }
        BookingOutcome::PaymentPending(booking) => HttpResponse::Accepted().json(
            ApiResponse::with_message(booking, "Slot reserved; payment will be retried"),
        ),
        BookingOutcome::PaymentFailed(booking) => {
            HttpResponse::Ok().json(ApiResponse::with_message(booking, "Payment failed"))
        }
    };

    Ok(response)
}

/// List bookings
///
/// GET /v1/bookings
#[instrument(skip(state, caller))]
pub async fn list_bookings(
    state: web::Data<AppState>,
    caller: Caller,
    filters: web::Query<BookingQueryParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let filter = filters.to_filter()?;
    let pagination = page.pagination();
    debug!(limit = pagination.limit(), offset = pagination.offset(), "Listing bookings");

    let bookings = state
        .bookings
        .list_bookings(caller.requester(), filter, pagination)
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(bookings, pagination)))
}

/// Get a booking
///
/// GET /v1/bookings/{id}
#[instrument(skip(state, caller))]
pub async fn get_booking(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let booking = state
        .bookings
        .get_booking(caller.requester(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Cancel a booking
///
/// DELETE /v1/bookings/{id}
#[instrument(skip(state, caller))]
pub async fn cancel_booking(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let booking = state
        .bookings
        .cancel_booking(caller.requester(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(booking, "Booking cancelled")))
}

/// Configure booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::get().to(list_bookings))
            .route("", web::post().to(create_booking))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}", web::delete().to(cancel_booking)),
    );
}

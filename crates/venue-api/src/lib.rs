//! API layer for the venue booking service
//!
//! HTTP handlers for bookings, facilities, overrides, and schedules.

#![forbid(unsafe_code)]

pub mod caller;
pub mod dto;
pub mod handlers;
pub mod state;

use actix_web::web;

pub use caller::Caller;
pub use dto::{ApiResponse, PaginationParams};
pub use state::AppState;

/// Mount every route under `/v1`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .configure(handlers::configure_health)
            .configure(handlers::configure_bookings)
            .configure(handlers::configure_facilities),
    );
}

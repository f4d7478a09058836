//! Shared application state

use std::sync::Arc;
use venue_services::{BookingService, FacilityService};

/// Services shared by every worker, registered as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub facilities: Arc<FacilityService>,
}

impl AppState {
    pub fn new(bookings: Arc<BookingService>, facilities: Arc<FacilityService>) -> Self {
        Self {
            bookings,
            facilities,
        }
    }
}

//! Business logic services for the booking service
//!
//! This crate coordinates the storage traits from venue-core with the
//! external payment and notification services.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies as `Arc<dyn Trait>` handles
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `BookingService` - Booking orchestration: price, reserve, charge, hand off to retries
//! - `FacilityService` - Facilities, schedule overrides, and the merged schedule view
//! - `PaymentRetryWorker` - Background loop re-attempting failed charges with backoff
//! - `HttpPaymentGateway` / `HttpNotifier` - Clients for the external collaborators

pub mod booking_service;
pub mod facility_service;
pub mod notification_client;
pub mod payment_client;
pub mod payment_retry_worker;

pub use booking_service::{BookingOutcome, BookingRequest, BookingService};
pub use facility_service::FacilityService;
pub use notification_client::HttpNotifier;
pub use payment_client::HttpPaymentGateway;
pub use payment_retry_worker::{PaymentRetryWorker, RetryBatchReport, RetryOutcome};

/// Business logic constants
pub mod constants {
    /// Title of the notification sent when retries are exhausted
    pub const PAYMENT_FAILED_TITLE: &str = "Payment Failed";

    /// Charge metadata key carrying the booking id
    pub const META_BOOKING_ID: &str = "booking_id";

    /// Charge metadata key carrying the facility id
    pub const META_FACILITY_ID: &str = "facility_id";

    /// Charge metadata key carrying the overall attempt number on retries
    pub const META_RETRY_ATTEMPT: &str = "retry_attempt";

    /// Body of the payment failure notification
    pub fn payment_failed_message(booking_id: &uuid::Uuid, error: &str) -> String {
        format!(
            "We were unable to process payment for booking {} after multiple attempts. Error: {}",
            booking_id, error
        )
    }
}

//! Repository implementations
//!
//! This module contains concrete implementations of the repository traits
//! defined in venue-core, using sqlx for PostgreSQL access.

pub mod booking_repo;
pub mod facility_repo;
pub mod override_repo;
pub mod payment_retry_repo;

pub use booking_repo::PgBookingRepository;
pub use facility_repo::PgFacilityRepository;
pub use override_repo::PgOverrideRepository;
pub use payment_retry_repo::PgPaymentRetryRepository;

//! Test support for the booking service
//!
//! In-memory implementations of the repository traits and scripted
//! payment/notification collaborators, so the orchestrator, the retry
//! worker and the HTTP handlers can be exercised without Postgres or
//! network services.

pub mod collaborators;
pub mod fixtures;
pub mod repositories;

pub use collaborators::{ChargeCall, RecordingNotifier, ScriptedPaymentGateway, SentNotification};
pub use fixtures::{at, date, new_facility, time};
pub use repositories::{
    InMemoryBackend, InMemoryBookingRepository, InMemoryFacilityRepository,
    InMemoryOverrideRepository, InMemoryPaymentRetryRepository,
};

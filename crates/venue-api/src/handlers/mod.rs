//! HTTP request handlers

pub mod booking;
pub mod facility;
pub mod health;

pub use booking::configure as configure_bookings;
pub use facility::configure as configure_facilities;
pub use health::configure as configure_health;

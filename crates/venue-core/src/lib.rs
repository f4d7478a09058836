//! Venue booking core library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the booking service. It includes:
//!
//! - Domain models (Facility, Booking, FacilityOverride, PaymentRetry)
//! - The rate calculator and the schedule merger (pure functions)
//! - Repository and collaborator traits
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

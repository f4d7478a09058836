//! Venue booking database layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the booking service. It includes:
//!
//! - Connection pool management with sqlx, including a startup wait
//! - Embedded schema migrations
//! - The reservation store with transactional overlap detection
//! - Facility, override, and payment retry repositories

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, run_migrations, wait_for_pool};
pub use repositories::*;

// Re-export commonly used types
pub use sqlx::{PgPool, Postgres, Transaction};
pub use venue_core::{AppError, AppResult};

//! Data Transfer Objects (DTOs) for API requests and responses

pub mod booking;
pub mod common;
pub mod facility;

pub use booking::*;
pub use common::*;
pub use facility::*;

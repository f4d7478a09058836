//! Unified error handling for the booking service
//!
//! This module provides a single error type covering storage, validation,
//! domain, authorization, and collaborator failures, with automatic HTTP
//! response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    // ==================== Authorization Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    // ==================== Business Logic Errors ====================
    #[error("Facility not found: {0}")]
    FacilityNotFound(String),

    #[error("Facility unavailable: {0}")]
    FacilityUnavailable(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Override not found: {0}")]
    OverrideNotFound(String),

    #[error("Booking conflict: facility {facility_id} is already booked in the requested interval")]
    BookingConflict { facility_id: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ==================== External Service Errors ====================
    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("Payment timed out after {0} seconds")]
    PaymentTimeout(u64),

    #[error("Notification failed: {0}")]
    Notification(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::FacilityUnavailable(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::FacilityNotFound(_)
            | AppError::BookingNotFound(_)
            | AppError::OverrideNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::BookingConflict { .. } | AppError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }

            // 502 Bad Gateway
            AppError::Payment(_) | AppError::PaymentTimeout(_) | AppError::Notification(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Migration(_) => "migration_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::FacilityNotFound(_) => "facility_not_found",
            AppError::FacilityUnavailable(_) => "facility_unavailable",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::OverrideNotFound(_) => "override_not_found",
            AppError::BookingConflict { .. } => "booking_conflict",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Payment(_) => "payment_error",
            AppError::PaymentTimeout(_) => "payment_timeout",
            AppError::Notification(_) => "notification_error",
        }
    }

    /// True for the overlap error raised by the reservation store
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::BookingConflict { .. })
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

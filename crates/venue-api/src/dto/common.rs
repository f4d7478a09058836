//! Common DTOs used across the API

use serde::{Deserialize, Serialize};
use venue_core::traits::Pagination;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Create a success response with data and message
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// `limit`/`offset` query parameters
///
/// Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response() {
        let resp = ApiResponse::success("test");
        assert_eq!(resp.data, "test");
        assert!(resp.message.is_none());

        let resp = ApiResponse::with_message("data", "success");
        assert_eq!(resp.message, Some("success".to_string()));

        let json = serde_json::to_value(ApiResponse::success(1)).unwrap();
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_pagination_params_clamp() {
        let params = PaginationParams {
            limit: Some(1000),
            offset: Some(-5),
        };
        let p = params.pagination();
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);

        assert_eq!(PaginationParams::default().pagination().limit(), 20);
    }
}

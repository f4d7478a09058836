//! Payment retry queue storage
//!
//! One row per booking. `schedule` upserts so a booking never has more
//! than one outstanding retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;
use venue_core::{models::PaymentRetry, traits::PaymentRetryRepository, AppError, AppResult};

/// PostgreSQL implementation of PaymentRetryRepository
pub struct PgPaymentRetryRepository {
    pool: PgPool,
}

impl PgPaymentRetryRepository {
    /// Create a new payment retry repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRetryRepository for PgPaymentRetryRepository {
    #[instrument(skip(self, last_error))]
    async fn schedule(
        &self,
        booking_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        attempt: i32,
        last_error: &str,
    ) -> AppResult<PaymentRetry> {
        debug!(
            "Scheduling payment retry for booking {} at {} (attempt {})",
            booking_id, next_attempt_at, attempt
        );

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRetryRow>(
            r#"
            INSERT INTO payment_retries (booking_id, attempt, next_attempt_at, last_error)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (booking_id) DO UPDATE
            SET attempt = EXCLUDED.attempt,
                next_attempt_at = EXCLUDED.next_attempt_at,
                last_error = EXCLUDED.last_error,
                updated_at = NOW()
            RETURNING booking_id, attempt, next_attempt_at, last_error, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .bind(attempt)
        .bind(next_attempt_at)
        .bind(last_error)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error scheduling retry for {}: {}", booking_id, e);
            AppError::Database(format!("Failed to schedule payment retry: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<PaymentRetry>> {
        let rows = sqlx::query_as::<sqlx::Postgres, PaymentRetryRow>(
            r#"
            SELECT booking_id, attempt, next_attempt_at, last_error, created_at, updated_at
            FROM payment_retries
            WHERE next_attempt_at <= $1
            ORDER BY next_attempt_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error fetching due retries: {}", e);
            AppError::Database(format!("Failed to fetch due payment retries: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find(&self, booking_id: Uuid) -> AppResult<Option<PaymentRetry>> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRetryRow>(
            r#"
            SELECT booking_id, attempt, next_attempt_at, last_error, created_at, updated_at
            FROM payment_retries
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding retry for {}: {}", booking_id, e);
            AppError::Database(format!("Failed to find payment retry: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn delete(&self, booking_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM payment_retries WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting retry for {}: {}", booking_id, e);
                AppError::Database(format!("Failed to delete payment retry: {}", e))
            })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct PaymentRetryRow {
    booking_id: Uuid,
    attempt: i32,
    next_attempt_at: DateTime<Utc>,
    last_error: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRetryRow> for PaymentRetry {
    fn from(row: PaymentRetryRow) -> Self {
        Self {
            booking_id: row.booking_id,
            attempt: row.attempt,
            next_attempt_at: row.next_attempt_at,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

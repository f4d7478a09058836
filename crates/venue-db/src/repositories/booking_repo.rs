//! Reservation store
//!
//! PostgreSQL-backed booking storage. Slot reservation locks the facility
//! row, checks for overlapping holding bookings, and inserts inside one
//! transaction; the `bookings_no_overlap` exclusion constraint backs this up
//! across service instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use venue_core::{
    models::{Booking, BookingFilter, BookingStatus, NewBooking},
    traits::{BookingRepository, Pagination},
    AppError, AppResult,
};

/// SQLSTATE raised by an exclusion constraint violation
const EXCLUSION_VIOLATION: &str = "23P01";

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse booking status from string
    fn parse_status(s: &str) -> BookingStatus {
        BookingStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown booking status in database: {}", s);
            BookingStatus::PendingPayment
        })
    }

    fn holding_statuses() -> Vec<String> {
        BookingStatus::HOLDING
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })
    }

    /// Load and lock a booking row inside `tx`
    async fn lock_booking(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
    ) -> AppResult<Booking> {
        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency, payment_intent,
                created_at, updated_at
            FROM bookings
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to lock booking {}: {}", id, e);
            AppError::Database(format!("Failed to lock booking: {}", e))
        })?
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

        Ok(row.into())
    }

    /// Write a status inside `tx`
    async fn write_status(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
        status: BookingStatus,
        payment_intent: Option<&str>,
    ) -> AppResult<Booking> {
        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            UPDATE bookings
            SET status = $2,
                payment_intent = COALESCE($3, payment_intent),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency, payment_intent,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(payment_intent)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Database error updating booking {} status: {}", id, e);
            AppError::Database(format!("Failed to update booking status: {}", e))
        })?;

        Ok(row.into())
    }
}

/// Map an insert failure, surfacing exclusion violations as conflicts
fn map_insert_error(e: sqlx::Error, facility_id: Uuid) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            warn!("Exclusion constraint rejected booking on facility {}", facility_id);
            return AppError::BookingConflict {
                facility_id: facility_id.to_string(),
            };
        }
    }

    error!("Database error creating booking: {}", e);
    AppError::Database(format!("Failed to create booking: {}", e))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self, booking), fields(facility_id = %booking.facility_id))]
    async fn create_booking(&self, booking: &NewBooking) -> AppResult<Booking> {
        debug!(
            "Reserving {} - {} for user {}",
            booking.starts_at, booking.ends_at, booking.user_id
        );

        let mut tx = self.begin().await?;

        // Lock facility row so reservations on it are serialized
        let locked: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM facilities
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(booking.facility_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to lock facility: {}", e);
            AppError::Database(format!("Failed to lock facility: {}", e))
        })?;

        if locked.is_none() {
            return Err(AppError::FacilityNotFound(booking.facility_id.to_string()));
        }

        let (conflict,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM bookings
                WHERE facility_id = $1
                    AND status = ANY($2)
                    AND starts_at < $4
                    AND ends_at > $3
            )
            "#,
        )
        .bind(booking.facility_id)
        .bind(Self::holding_statuses())
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to check booking conflicts: {}", e);
            AppError::Database(format!("Failed to check conflicts: {}", e))
        })?;

        if conflict {
            warn!(
                "Booking conflict on facility {} for {} - {}",
                booking.facility_id, booking.starts_at, booking.ends_at
            );
            return Err(AppError::BookingConflict {
                facility_id: booking.facility_id.to_string(),
            });
        }

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            INSERT INTO bookings (
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency, payment_intent,
                created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(booking.facility_id)
        .bind(booking.user_id)
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .bind(BookingStatus::PendingPayment.as_str())
        .bind(booking.amount_cents)
        .bind(&booking.currency)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, booking.facility_id))?;

        Self::commit(tx).await?;

        info!(
            "Reserved booking {} on facility {}: {} {}",
            row.id, row.facility_id, row.amount_cents, row.currency
        );

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        debug!("Finding booking by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency, payment_intent,
                created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_intent: Option<&str>,
    ) -> AppResult<Booking> {
        debug!("Updating booking {} status to {}", id, status);

        let mut tx = self.begin().await?;
        let current = Self::lock_booking(&mut tx, id).await?;

        if !current.status.can_transition_to(status) {
            warn!(
                "Rejected status change of booking {}: {} -> {}",
                id, current.status, status
            );
            return Err(AppError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        let updated = Self::write_status(&mut tx, id, status, payment_intent).await?;
        Self::commit(tx).await?;

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, id: Uuid) -> AppResult<Booking> {
        debug!("Cancelling booking {}", id);

        let mut tx = self.begin().await?;
        let current = Self::lock_booking(&mut tx, id).await?;

        if current.status == BookingStatus::Cancelled {
            debug!("Booking {} already cancelled", id);
            return Ok(current);
        }

        if !current.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::InvalidTransition {
                from: current.status.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        let cancelled = Self::write_status(&mut tx, id, BookingStatus::Cancelled, None).await?;
        Self::commit(tx).await?;

        info!("Cancelled booking {}", id);
        Ok(cancelled)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &BookingFilter, pagination: Pagination) -> AppResult<Vec<Booking>> {
        debug!(
            "Listing bookings with filters: user={:?}, facility={:?}, status={:?}, limit={}, offset={}",
            filter.user_id,
            filter.facility_id,
            filter.status,
            pagination.limit(),
            pagination.offset()
        );

        let rows = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, facility_id, user_id, starts_at, ends_at,
                status, amount_cents, currency, payment_intent,
                created_at, updated_at
            FROM bookings
            WHERE ($1::uuid IS NULL OR user_id = $1)
                AND ($2::uuid IS NULL OR facility_id = $2)
                AND ($3::text IS NULL OR status = $3)
            ORDER BY starts_at DESC, id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.facility_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing bookings: {}", e);
            AppError::Database(format!("Failed to list bookings: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    facility_id: Uuid,
    user_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    amount_cents: i64,
    currency: String,
    payment_intent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            user_id: row.user_id,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            status: PgBookingRepository::parse_status(&row.status),
            amount_cents: row.amount_cents,
            currency: row.currency,
            payment_intent: row.payment_intent,
            created_at: row.created_at,
            updated_at: row.updated_at,
            facility: None,
        }
    }
}

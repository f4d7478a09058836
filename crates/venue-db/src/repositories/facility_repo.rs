//! Facility repository implementation
//!
//! Provides PostgreSQL-backed storage for bookable facilities.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use venue_core::{
    models::{Facility, FacilityFilter, NewFacility},
    traits::{FacilityRepository, Pagination},
    AppError, AppResult,
};

/// PostgreSQL implementation of FacilityRepository
pub struct PgFacilityRepository {
    pool: PgPool,
}

impl PgFacilityRepository {
    /// Create a new facility repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FacilityRepository for PgFacilityRepository {
    #[instrument(skip(self, facility), fields(name = %facility.name))]
    async fn create(&self, facility: &NewFacility) -> AppResult<Facility> {
        debug!("Creating facility for venue {}", facility.venue_id);

        let row = sqlx::query_as::<sqlx::Postgres, FacilityRow>(
            r#"
            INSERT INTO facilities (
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9, $10)
            RETURNING
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency,
                created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(facility.venue_id)
        .bind(&facility.name)
        .bind(&facility.description)
        .bind(&facility.surface)
        .bind(facility.open_at)
        .bind(facility.close_at)
        .bind(facility.weekday_rate())
        .bind(facility.weekend_rate())
        .bind(facility.currency())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating facility: {}", e);
            AppError::Database(format!("Failed to create facility: {}", e))
        })?;

        info!("Created facility {}", row.id);
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Facility>> {
        debug!("Finding facility by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, FacilityRow>(
            r#"
            SELECT
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency,
                created_at, updated_at
            FROM facilities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding facility {}: {}", id, e);
            AppError::Database(format!("Failed to find facility: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &FacilityFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<Facility>> {
        debug!(
            "Listing facilities with filters: venue={:?}, available={:?}, limit={}, offset={}",
            filter.venue_id,
            filter.available,
            pagination.limit(),
            pagination.offset()
        );

        let rows = sqlx::query_as::<sqlx::Postgres, FacilityRow>(
            r#"
            SELECT
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency,
                created_at, updated_at
            FROM facilities
            WHERE ($1::uuid IS NULL OR venue_id = $1)
                AND ($2::boolean IS NULL OR available = $2)
            ORDER BY name, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.venue_id)
        .bind(filter.available)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing facilities: {}", e);
            AppError::Database(format!("Failed to list facilities: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn set_availability(&self, id: Uuid, available: bool) -> AppResult<Facility> {
        debug!("Setting facility {} availability to {}", id, available);

        let row = sqlx::query_as::<sqlx::Postgres, FacilityRow>(
            r#"
            UPDATE facilities
            SET available = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(available)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating facility {}: {}", id, e);
            AppError::Database(format!("Failed to update facility: {}", e))
        })?
        .ok_or_else(|| AppError::FacilityNotFound(id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self, facility), fields(name = %facility.name))]
    async fn ensure(&self, id: Uuid, facility: &NewFacility) -> AppResult<Facility> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO facilities (
                id, venue_id, name, description, surface,
                open_at, close_at, available,
                weekday_rate_cents, weekend_rate_cents, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(facility.venue_id)
        .bind(&facility.name)
        .bind(&facility.description)
        .bind(&facility.surface)
        .bind(facility.open_at)
        .bind(facility.close_at)
        .bind(facility.weekday_rate())
        .bind(facility.weekend_rate())
        .bind(facility.currency())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error seeding facility {}: {}", id, e);
            AppError::Database(format!("Failed to seed facility: {}", e))
        })?;

        if inserted.rows_affected() > 0 {
            info!("Seeded facility {}", id);
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::FacilityNotFound(id.to_string()))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct FacilityRow {
    id: Uuid,
    venue_id: Uuid,
    name: String,
    description: Option<String>,
    surface: Option<String>,
    open_at: NaiveTime,
    close_at: NaiveTime,
    available: bool,
    weekday_rate_cents: i64,
    weekend_rate_cents: i64,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Self {
            id: row.id,
            venue_id: row.venue_id,
            name: row.name,
            description: row.description,
            surface: row.surface,
            open_at: row.open_at,
            close_at: row.close_at,
            available: row.available,
            weekday_rate_cents: row.weekday_rate_cents,
            weekend_rate_cents: row.weekend_rate_cents,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

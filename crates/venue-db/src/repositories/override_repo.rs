//! Facility override repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use venue_core::{
    models::{FacilityOverride, NewFacilityOverride},
    traits::OverrideRepository,
    AppError, AppResult,
};

/// PostgreSQL implementation of OverrideRepository
pub struct PgOverrideRepository {
    pool: PgPool,
}

impl PgOverrideRepository {
    /// Create a new override repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OverrideRepository for PgOverrideRepository {
    #[instrument(skip(self, new), fields(facility_id = %new.facility_id))]
    async fn create(&self, new: &NewFacilityOverride) -> AppResult<FacilityOverride> {
        debug!(
            "Creating override {} - {} (all_day={})",
            new.start_date, new.end_date, new.all_day
        );

        let weekdays: Vec<i16> = new.weekdays.iter().map(|d| i16::from(*d)).collect();

        let row = sqlx::query_as::<sqlx::Postgres, OverrideRow>(
            r#"
            INSERT INTO facility_overrides (
                id, facility_id, start_date, end_date,
                all_day, open_at, close_at, reason, weekdays
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, facility_id, start_date, end_date,
                all_day, open_at, close_at, reason, weekdays, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.facility_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.all_day)
        .bind(new.open_at)
        .bind(new.close_at)
        .bind(&new.reason)
        .bind(weekdays)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating override: {}", e);
            AppError::Database(format!("Failed to create override: {}", e))
        })?;

        info!("Created override {} for facility {}", row.id, row.facility_id);
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_by_facility(&self, facility_id: Uuid) -> AppResult<Vec<FacilityOverride>> {
        let rows = sqlx::query_as::<sqlx::Postgres, OverrideRow>(
            r#"
            SELECT
                id, facility_id, start_date, end_date,
                all_day, open_at, close_at, reason, weekdays, created_at
            FROM facility_overrides
            WHERE facility_id = $1
            ORDER BY start_date, created_at, id
            "#,
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing overrides: {}", e);
            AppError::Database(format!("Failed to list overrides: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_in_range(
        &self,
        facility_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<FacilityOverride>> {
        let rows = sqlx::query_as::<sqlx::Postgres, OverrideRow>(
            r#"
            SELECT
                id, facility_id, start_date, end_date,
                all_day, open_at, close_at, reason, weekdays, created_at
            FROM facility_overrides
            WHERE facility_id = $1
                AND start_date <= $3
                AND end_date >= $2
            ORDER BY start_date, created_at, id
            "#,
        )
        .bind(facility_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing overrides in range: {}", e);
            AppError::Database(format!("Failed to list overrides: {}", e))
        })?;

        debug!("Found {} overrides between {} and {}", rows.len(), from, to);
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn delete(&self, facility_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM facility_overrides WHERE id = $1 AND facility_id = $2")
            .bind(id)
            .bind(facility_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting override {}: {}", id, e);
                AppError::Database(format!("Failed to delete override: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::OverrideNotFound(id.to_string()));
        }

        info!("Deleted override {}", id);
        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    id: Uuid,
    facility_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    all_day: bool,
    open_at: Option<NaiveTime>,
    close_at: Option<NaiveTime>,
    reason: String,
    weekdays: Vec<i16>,
    created_at: DateTime<Utc>,
}

impl From<OverrideRow> for FacilityOverride {
    fn from(row: OverrideRow) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            start_date: row.start_date,
            end_date: row.end_date,
            all_day: row.all_day,
            open_at: row.open_at,
            close_at: row.close_at,
            reason: row.reason,
            weekdays: row
                .weekdays
                .into_iter()
                .filter_map(|d| u8::try_from(d).ok())
                .collect(),
            created_at: row.created_at,
        }
    }
}

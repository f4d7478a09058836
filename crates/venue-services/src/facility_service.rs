//! Facility service
//!
//! Facility CRUD, schedule overrides, and the merged schedule view.
//! Changes to facilities and overrides require an elevated caller.

use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use venue_core::models::{
    Facility, FacilityFilter, FacilityOverride, NewFacility, NewFacilityOverride, Requester,
};
use venue_core::config::SeedConfig;
use venue_core::schedule::{merge_schedule, validate_range, ScheduleDay};
use venue_core::traits::{FacilityRepository, OverrideRepository, Pagination};
use venue_core::{AppError, AppResult};

/// Indoor court created on first start
fn default_facility(venue_id: Uuid) -> NewFacility {
    NewFacility {
        venue_id,
        name: "Center Court".to_string(),
        description: Some("Indoor pickleball court".to_string()),
        surface: Some("hardwood".to_string()),
        open_at: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
        close_at: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
        weekday_rate_cents: None,
        weekend_rate_cents: None,
        currency: None,
    }
}

pub struct FacilityService {
    facilities: Arc<dyn FacilityRepository>,
    overrides: Arc<dyn OverrideRepository>,
}

impl FacilityService {
    pub fn new(
        facilities: Arc<dyn FacilityRepository>,
        overrides: Arc<dyn OverrideRepository>,
    ) -> Self {
        Self {
            facilities,
            overrides,
        }
    }

    fn require_elevated(requester: &Requester) -> AppResult<()> {
        if requester.is_elevated() {
            Ok(())
        } else {
            warn!("User {} attempted a facility change without privileges", requester.user_id);
            Err(AppError::Forbidden)
        }
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_facility(&self, requester: &Requester, new: NewFacility) -> AppResult<Facility> {
        Self::require_elevated(requester)?;

        if new.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if new.open_at >= new.close_at {
            return Err(AppError::Validation(
                "openAt must be before closeAt".to_string(),
            ));
        }
        if new.weekday_rate() < 0 || new.weekend_rate() < 0 {
            return Err(AppError::Validation("rates must not be negative".to_string()));
        }

        let facility = self.facilities.create(&new).await?;
        info!("Facility created: {} ({})", facility.name, facility.id);
        Ok(facility)
    }

    /// Make sure the configured default facility exists
    ///
    /// Existing rows are left untouched. Returns `None` when seeding is off.
    #[instrument(skip(self, seed), fields(facility_id = %seed.facility_id))]
    pub async fn seed_default_facility(&self, seed: &SeedConfig) -> AppResult<Option<Facility>> {
        if !seed.enabled {
            return Ok(None);
        }

        let facility = self
            .facilities
            .ensure(seed.facility_id, &default_facility(seed.venue_id))
            .await?;
        info!("Default facility ensured: {} ({})", facility.name, facility.id);
        Ok(Some(facility))
    }

    pub async fn get_facility(&self, id: Uuid) -> AppResult<Facility> {
        self.facilities
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::FacilityNotFound(id.to_string()))
    }

    pub async fn list_facilities(
        &self,
        filter: &FacilityFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<Facility>> {
        self.facilities.list(filter, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        requester: &Requester,
        id: Uuid,
        available: bool,
    ) -> AppResult<Facility> {
        Self::require_elevated(requester)?;
        let facility = self.facilities.set_availability(id, available).await?;
        info!("Facility {} availability set to {}", id, available);
        Ok(facility)
    }

    #[instrument(skip(self, new), fields(facility_id = %new.facility_id))]
    pub async fn create_override(
        &self,
        requester: &Requester,
        new: NewFacilityOverride,
    ) -> AppResult<FacilityOverride> {
        Self::require_elevated(requester)?;
        let new = new.validated()?;
        self.get_facility(new.facility_id).await?;

        let created = self.overrides.create(&new).await?;
        info!(
            "Override {} created for facility {} ({} to {})",
            created.id, created.facility_id, created.start_date, created.end_date
        );
        Ok(created)
    }

    pub async fn list_overrides(&self, facility_id: Uuid) -> AppResult<Vec<FacilityOverride>> {
        self.get_facility(facility_id).await?;
        self.overrides.list_by_facility(facility_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_override(
        &self,
        requester: &Requester,
        facility_id: Uuid,
        override_id: Uuid,
    ) -> AppResult<()> {
        Self::require_elevated(requester)?;
        self.overrides.delete(facility_id, override_id).await?;
        info!("Override {} deleted from facility {}", override_id, facility_id);
        Ok(())
    }

    /// Effective opening hours for every day in `[from, to]`
    #[instrument(skip(self))]
    pub async fn schedule(
        &self,
        facility_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<ScheduleDay>> {
        validate_range(from, to)?;
        let facility = self.get_facility(facility_id).await?;
        let overrides = self.overrides.list_in_range(facility_id, from, to).await?;
        merge_schedule(&facility, &overrides, from, to)
    }
}

//! Facility, override, and schedule DTOs

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use venue_core::models::{hhmm, FacilityFilter, NewFacility, NewFacilityOverride};
use venue_core::schedule::ScheduleDay;

/// Facility creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacilityRequest {
    pub venue_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,

    pub description: Option<String>,

    pub surface: Option<String>,

    /// Daily opening time, `HH:MM`
    #[serde(with = "hhmm")]
    pub open_at: NaiveTime,

    /// Daily closing time, `HH:MM`
    #[serde(with = "hhmm")]
    pub close_at: NaiveTime,

    /// Defaults to 4500
    #[validate(range(min = 0))]
    pub weekday_rate_cents: Option<i64>,

    /// Defaults to the weekday rate
    #[validate(range(min = 0))]
    pub weekend_rate_cents: Option<i64>,

    /// ISO 4217 code, defaults to CAD
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: Option<String>,
}

impl From<CreateFacilityRequest> for NewFacility {
    fn from(req: CreateFacilityRequest) -> Self {
        NewFacility {
            venue_id: req.venue_id,
            name: req.name.trim().to_string(),
            description: req.description,
            surface: req.surface,
            open_at: req.open_at,
            close_at: req.close_at,
            weekday_rate_cents: req.weekday_rate_cents,
            weekend_rate_cents: req.weekend_rate_cents,
            currency: req.currency,
        }
    }
}

/// Facility update request (availability toggle)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFacilityRequest {
    pub available: bool,
}

/// Facility list filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityQueryParams {
    pub venue_id: Option<Uuid>,
    pub available: Option<bool>,
}

impl From<&FacilityQueryParams> for FacilityFilter {
    fn from(params: &FacilityQueryParams) -> Self {
        FacilityFilter {
            venue_id: params.venue_id,
            available: params.available,
        }
    }
}

/// Override creation request; the facility comes from the path
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOverrideRequest {
    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[serde(default)]
    pub all_day: bool,

    #[serde(default, with = "hhmm::option")]
    pub open_at: Option<NaiveTime>,

    #[serde(default, with = "hhmm::option")]
    pub close_at: Option<NaiveTime>,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: String,

    /// 0 = Sunday .. 6 = Saturday; empty means every day
    #[serde(default)]
    pub weekdays: Vec<u8>,
}

impl CreateOverrideRequest {
    pub fn into_new(self, facility_id: Uuid) -> NewFacilityOverride {
        NewFacilityOverride {
            facility_id,
            start_date: self.start_date,
            end_date: self.end_date,
            all_day: self.all_day,
            open_at: self.open_at,
            close_at: self.close_at,
            reason: self.reason,
            weekdays: self.weekdays,
        }
    }
}

/// Schedule query range, both ends inclusive
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Merged schedule of one facility
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub facility_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<ScheduleDay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facility_request_parses_times() {
        let req: CreateFacilityRequest = serde_json::from_value(serde_json::json!({
            "venueId": Uuid::new_v4(),
            "name": "Court 1",
            "openAt": "08:00",
            "closeAt": "22:00",
            "weekdayRateCents": 4500,
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        let new: NewFacility = req.into();
        assert_eq!(new.open_at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(new.weekend_rate(), 4500);
    }

    #[test]
    fn test_facility_request_rejects_bad_input() {
        let bad_time = serde_json::from_value::<CreateFacilityRequest>(serde_json::json!({
            "venueId": Uuid::new_v4(),
            "name": "Court 1",
            "openAt": "8am",
            "closeAt": "22:00",
        }));
        assert!(bad_time.is_err());

        let req: CreateFacilityRequest = serde_json::from_value(serde_json::json!({
            "venueId": Uuid::new_v4(),
            "name": "",
            "openAt": "08:00",
            "closeAt": "22:00",
            "weekdayRateCents": -5,
            "currency": "DOLLARS",
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("weekday_rate_cents"));
        assert!(fields.contains_key("currency"));
    }

    #[test]
    fn test_override_request_defaults() {
        let req: CreateOverrideRequest = serde_json::from_value(serde_json::json!({
            "startDate": "2024-07-04",
            "endDate": "2024-07-04",
            "allDay": true,
            "reason": "Independence Day",
        }))
        .unwrap();

        let facility_id = Uuid::new_v4();
        let new = req.into_new(facility_id);
        assert_eq!(new.facility_id, facility_id);
        assert!(new.weekdays.is_empty());
        assert!(new.open_at.is_none());
    }
}

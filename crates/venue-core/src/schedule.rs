//! Schedule merger
//!
//! Combines a facility's recurring daily hours with its date-ranged
//! overrides into one entry per calendar day.

use crate::models::{Facility, FacilityOverride};
use crate::{AppError, AppResult};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Longest range a single schedule query may span, in days
pub const MAX_SCHEDULE_DAYS: i64 = 366;

/// Open interval within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    #[serde(with = "crate::models::hhmm")]
    pub open_at: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub close_at: NaiveTime,
}

/// Availability of a facility on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
    pub slots: Vec<ScheduleSlot>,
}

impl ScheduleDay {
    fn open(date: NaiveDate, open_at: NaiveTime, close_at: NaiveTime, reason: Option<String>) -> Self {
        Self {
            date,
            closed: false,
            reason,
            slots: vec![ScheduleSlot { open_at, close_at }],
        }
    }

    fn closed(date: NaiveDate, reason: Option<String>) -> Self {
        Self {
            date,
            closed: true,
            reason,
            slots: Vec::new(),
        }
    }
}

/// Check a `[from, to]` schedule range
pub fn validate_range(from: NaiveDate, to: NaiveDate) -> AppResult<()> {
    if to < from {
        return Err(AppError::Validation(format!(
            "to {} is before from {}",
            to, from
        )));
    }
    if (to - from).num_days() >= MAX_SCHEDULE_DAYS {
        return Err(AppError::Validation(format!(
            "schedule range exceeds {} days",
            MAX_SCHEDULE_DAYS
        )));
    }
    Ok(())
}

/// Merge recurring hours and overrides for every day in `[from, to]`
///
/// Overrides are considered in start-date order; among equal start dates the
/// input order is kept. The first override governing a day wins.
pub fn merge_schedule(
    facility: &Facility,
    overrides: &[FacilityOverride],
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<ScheduleDay>> {
    validate_range(from, to)?;

    let mut relevant: Vec<&FacilityOverride> = overrides
        .iter()
        .filter(|o| o.facility_id == facility.id && o.intersects(from, to))
        .collect();
    relevant.sort_by_key(|o| o.start_date);

    let days = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            let day = match relevant.iter().find(|o| o.applies_on(date)) {
                Some(o) => match o.hours() {
                    Some((open, close)) => ScheduleDay::open(date, open, close, reason_of(o)),
                    None => ScheduleDay::closed(date, reason_of(o)),
                },
                None => ScheduleDay::open(date, facility.open_at, facility.close_at, None),
            };
            normalize(day)
        })
        .collect();

    Ok(days)
}

fn reason_of(o: &FacilityOverride) -> Option<String> {
    Some(o.reason.clone()).filter(|r| !r.is_empty())
}

fn normalize(mut day: ScheduleDay) -> ScheduleDay {
    if day.slots.is_empty() {
        day.closed = true;
    }
    day
}

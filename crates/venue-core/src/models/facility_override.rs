//! Facility override model
//!
//! An override replaces a facility's recurring hours for a date range:
//! either closing it all day or substituting different hours, optionally
//! only on selected weekdays.

use crate::{AppError, AppResult};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weekday index of `date`, 0 = Sunday .. 6 = Saturday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Date-ranged exception to a facility's recurring hours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityOverride {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub all_day: bool,
    #[serde(with = "crate::models::hhmm::option", default)]
    pub open_at: Option<NaiveTime>,
    #[serde(with = "crate::models::hhmm::option", default)]
    pub close_at: Option<NaiveTime>,
    pub reason: String,
    /// Applicable weekdays; empty means every day
    pub weekdays: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl FacilityOverride {
    /// True when `date` lies inside `[start_date, end_date]`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// True when this override governs `date`
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.covers(date)
            && (self.weekdays.is_empty() || self.weekdays.contains(&weekday_index(date)))
    }

    /// True when `[start_date, end_date]` intersects `[from, to]`
    pub fn intersects(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date >= from
    }

    /// Replacement hours, or `None` when the override closes the day
    pub fn hours(&self) -> Option<(NaiveTime, NaiveTime)> {
        if self.all_day {
            return None;
        }
        match (self.open_at, self.close_at) {
            (Some(open), Some(close)) => Some((open, close)),
            _ => None,
        }
    }
}

/// Data for creating an override
#[derive(Debug, Clone)]
pub struct NewFacilityOverride {
    pub facility_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub all_day: bool,
    pub open_at: Option<NaiveTime>,
    pub close_at: Option<NaiveTime>,
    pub reason: String,
    pub weekdays: Vec<u8>,
}

impl NewFacilityOverride {
    /// Check the override invariants and normalize the weekday set
    pub fn validated(mut self) -> AppResult<Self> {
        if self.end_date < self.start_date {
            return Err(AppError::Validation(format!(
                "endDate {} is before startDate {}",
                self.end_date, self.start_date
            )));
        }

        if let Some(day) = self.weekdays.iter().find(|d| **d > 6) {
            return Err(AppError::Validation(format!(
                "weekday {} out of range 0..=6",
                day
            )));
        }

        if !self.all_day {
            match (self.open_at, self.close_at) {
                (Some(open), Some(close)) if open < close => {}
                (Some(_), Some(_)) => {
                    return Err(AppError::Validation(
                        "openAt must be before closeAt".to_string(),
                    ))
                }
                _ => {
                    return Err(AppError::Validation(
                        "openAt and closeAt are required unless allDay".to_string(),
                    ))
                }
            }
        }

        self.weekdays.sort_unstable();
        self.weekdays.dedup();
        self.reason = self.reason.trim().to_string();

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn new_override() -> NewFacilityOverride {
        NewFacilityOverride {
            facility_id: Uuid::new_v4(),
            start_date: date("2024-07-01"),
            end_date: date("2024-07-07"),
            all_day: false,
            open_at: Some(time(10, 0)),
            close_at: Some(time(14, 0)),
            reason: " Tournament ".to_string(),
            weekdays: vec![6, 0, 6],
        }
    }

    #[test]
    fn test_weekday_index_starts_on_sunday() {
        assert_eq!(weekday_index(date("2024-07-07")), 0); // Sunday
        assert_eq!(weekday_index(date("2024-07-01")), 1); // Monday
        assert_eq!(weekday_index(date("2024-07-06")), 6); // Saturday
    }

    #[test]
    fn test_validated_normalizes_weekdays() {
        let o = new_override().validated().unwrap();
        assert_eq!(o.weekdays, vec![0, 6]);
        assert_eq!(o.reason, "Tournament");
    }

    #[test]
    fn test_validated_rejects_bad_input() {
        let o = NewFacilityOverride {
            end_date: date("2024-06-30"),
            ..new_override()
        };
        assert!(matches!(o.validated(), Err(AppError::Validation(_))));

        let o = NewFacilityOverride {
            weekdays: vec![7],
            ..new_override()
        };
        assert!(matches!(o.validated(), Err(AppError::Validation(_))));

        let o = NewFacilityOverride {
            close_at: None,
            ..new_override()
        };
        assert!(matches!(o.validated(), Err(AppError::Validation(_))));

        let o = NewFacilityOverride {
            open_at: Some(time(15, 0)),
            ..new_override()
        };
        assert!(matches!(o.validated(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_all_day_needs_no_times() {
        let o = NewFacilityOverride {
            all_day: true,
            open_at: None,
            close_at: None,
            ..new_override()
        };
        assert!(o.validated().is_ok());
    }

    #[test]
    fn test_applies_on_respects_weekdays() {
        let o = FacilityOverride {
            id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            start_date: date("2024-07-01"),
            end_date: date("2024-07-14"),
            all_day: true,
            open_at: None,
            close_at: None,
            reason: "Saturdays off".to_string(),
            weekdays: vec![6],
            created_at: Utc::now(),
        };
        assert!(o.applies_on(date("2024-07-06")));
        assert!(!o.applies_on(date("2024-07-05")));
        assert!(!o.applies_on(date("2024-07-20")));
        assert!(o.intersects(date("2024-07-14"), date("2024-07-30")));
        assert!(!o.intersects(date("2024-07-15"), date("2024-07-30")));
        assert_eq!(o.hours(), None);
    }
}

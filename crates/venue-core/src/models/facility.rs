//! Facility model
//!
//! A facility is a single bookable resource (a court, a field, a room) with
//! recurring daily hours and a weekday/weekend hourly rate. The hourly rate
//! also drives the rate calculator used when a booking is priced.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default hourly rate in minor units when a facility is created without one
pub const DEFAULT_WEEKDAY_RATE_CENTS: i64 = 4500;

/// Default ISO currency code for new facilities
pub const DEFAULT_CURRENCY: &str = "CAD";

const MICROS_PER_HOUR: i64 = 3_600_000_000;

/// Bookable facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub surface: Option<String>,
    #[serde(with = "crate::models::hhmm")]
    pub open_at: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub close_at: NaiveTime,
    pub available: bool,
    pub weekday_rate_cents: i64,
    pub weekend_rate_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    /// Hourly rate that applies to an interval starting at `start`
    ///
    /// The weekday is taken in the offset the instant carries, so a caller
    /// booking in local time gets the local weekday.
    pub fn hourly_rate_at<Tz: TimeZone>(&self, start: &DateTime<Tz>) -> i64 {
        if is_weekend(start.weekday()) {
            self.weekend_rate_cents
        } else {
            self.weekday_rate_cents
        }
    }

    /// Price of `[start, end)` in minor units
    ///
    /// Partial hours round up. A non-positive interval is priced as one hour.
    pub fn price<Tz: TimeZone>(&self, start: &DateTime<Tz>, end: &DateTime<Tz>) -> i64 {
        self.hourly_rate_at(start)
            .saturating_mul(billed_hours(start, end))
    }
}

/// Billed hours for `[start, end)`: ceiling of the duration, one hour minimum
pub fn billed_hours<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> i64 {
    let duration = end.clone().signed_duration_since(start.clone());
    let micros = duration.num_microseconds().unwrap_or(i64::MAX);
    if micros <= 0 {
        return 1;
    }
    micros / MICROS_PER_HOUR + i64::from(micros % MICROS_PER_HOUR != 0)
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Data for creating a facility
#[derive(Debug, Clone)]
pub struct NewFacility {
    pub venue_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub surface: Option<String>,
    pub open_at: NaiveTime,
    pub close_at: NaiveTime,
    pub weekday_rate_cents: Option<i64>,
    pub weekend_rate_cents: Option<i64>,
    pub currency: Option<String>,
}

impl NewFacility {
    /// Weekday rate, falling back to the service default
    pub fn weekday_rate(&self) -> i64 {
        self.weekday_rate_cents
            .unwrap_or(DEFAULT_WEEKDAY_RATE_CENTS)
    }

    /// Weekend rate, falling back to the weekday rate
    pub fn weekend_rate(&self) -> i64 {
        self.weekend_rate_cents.unwrap_or_else(|| self.weekday_rate())
    }

    pub fn currency(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_uppercase()
    }
}

/// Facility listing filter
#[derive(Debug, Clone, Default)]
pub struct FacilityFilter {
    pub venue_id: Option<Uuid>,
    pub available: Option<bool>,
}

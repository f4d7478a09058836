//! Small constructors shared by tests

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;
use venue_core::models::NewFacility;

/// Parse an RFC 3339 instant, panicking on bad input
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad timestamp {s}: {e}"))
        .with_timezone(&Utc)
}

/// Parse a `YYYY-MM-DD` date, panicking on bad input
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| panic!("bad date {s}: {e}"))
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_else(|| panic!("bad time {h}:{m}"))
}

/// Court open 08:00-22:00 at 4500 weekday / 6000 weekend, CAD
pub fn new_facility(name: &str) -> NewFacility {
    NewFacility {
        venue_id: Uuid::new_v4(),
        name: name.to_string(),
        description: Some("Indoor court".to_string()),
        surface: Some("hardwood".to_string()),
        open_at: time(8, 0),
        close_at: time(22, 0),
        weekday_rate_cents: Some(4500),
        weekend_rate_cents: Some(6000),
        currency: Some("CAD".to_string()),
    }
}

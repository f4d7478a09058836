//! Domain models for the booking service
//!
//! This module contains all the core domain models used throughout the application.

pub mod booking;
pub mod caller;
pub mod facility;
pub mod facility_override;
pub mod payment_retry;

pub use booking::{Booking, BookingFilter, BookingStatus, NewBooking};
pub use caller::{Requester, Role};
pub use facility::{Facility, FacilityFilter, NewFacility};
pub use facility_override::{FacilityOverride, NewFacilityOverride};
pub use payment_retry::{PaymentRetry, RetryDecision, RetryPolicy};

/// Serde helpers for `HH:MM` time-of-day fields
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    /// Parse `HH:MM`, also accepting `HH:MM:SS`
    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn format(t: &NaiveTime) -> String {
        t.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&super::format(t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}"))),
            }
        }
    }

}

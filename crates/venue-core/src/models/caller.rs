//! Caller identity
//!
//! The gateway verifies credentials and forwards the caller's id and roles.
//! This module only models what the booking core needs from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular member booking for themself
    #[default]
    Member,
    /// Front-desk operator; read-only on bookings
    Operator,
    /// Administrator of a single venue
    VenueAdmin,
    /// Platform administrator
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "MEMBER"),
            Role::Operator => write!(f, "OPERATOR"),
            Role::VenueAdmin => write!(f, "VENUE_ADMIN"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl Role {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MEMBER" => Some(Role::Member),
            "OPERATOR" => Some(Role::Operator),
            "VENUE_ADMIN" => Some(Role::VenueAdmin),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Check if role may act on behalf of other users
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::VenueAdmin)
    }

    /// Check if role may create and cancel bookings
    pub fn can_write_bookings(&self) -> bool {
        !matches!(self, Role::Operator)
    }
}

/// Authenticated caller of a core operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

impl Requester {
    pub fn new(user_id: Uuid, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn member(user_id: Uuid) -> Self {
        Self::new(user_id, vec![Role::Member])
    }

    /// Parse a comma separated role list, skipping unknown roles
    pub fn parse_roles(raw: &str) -> Vec<Role> {
        raw.split(',').filter_map(Role::from_str).collect()
    }

    pub fn is_elevated(&self) -> bool {
        self.roles.iter().any(Role::is_elevated)
    }

    /// True when the caller may create or cancel bookings
    pub fn can_write_bookings(&self) -> bool {
        self.roles.iter().any(Role::can_write_bookings)
    }

    /// True when the caller may act for `user_id`
    pub fn can_act_for(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.is_elevated()
    }
}

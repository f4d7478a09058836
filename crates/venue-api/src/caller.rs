//! Caller identity extractor
//!
//! Credentials are verified upstream; the gateway forwards the caller as
//! `X-User-ID` (UUID) and `X-User-Roles` (comma-separated role names).
//! A caller without recognised roles is a member.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::ops::Deref;
use tracing::debug;
use uuid::Uuid;
use venue_core::models::{Requester, Role};
use venue_core::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

/// Authenticated caller of a request
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use venue_api::Caller;
///
/// async fn whoami(caller: Caller) -> HttpResponse {
///     HttpResponse::Ok().body(caller.user_id.to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub Requester);

impl Caller {
    pub fn requester(&self) -> &Requester {
        &self.0
    }
}

impl Deref for Caller {
    type Target = Requester;

    fn deref(&self) -> &Requester {
        &self.0
    }
}

fn caller_from_request(req: &HttpRequest) -> Result<Caller, AppError> {
    let raw_id = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("unreadable {} header", USER_ID_HEADER)))?;

    let user_id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| AppError::Unauthorized(format!("{} is not a UUID", USER_ID_HEADER)))?;

    let mut roles = req
        .headers()
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(Requester::parse_roles)
        .unwrap_or_default();
    if roles.is_empty() {
        roles.push(Role::default());
    }

    debug!(user_id = %user_id, roles = ?roles, "Caller identified");

    Ok(Caller(Requester::new(user_id, roles)))
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_request(req).map_err(actix_web::Error::from))
    }
}

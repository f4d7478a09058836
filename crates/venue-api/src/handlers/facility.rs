//! Facility handlers
//!
//! HTTP handlers for facilities, their overrides, and the merged schedule.

use crate::caller::Caller;
use crate::dto::{
    ApiResponse, CreateFacilityRequest, CreateOverrideRequest, FacilityQueryParams,
    PaginationParams, ScheduleQuery, ScheduleResponse, UpdateFacilityRequest,
};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;
use venue_core::models::FacilityFilter;
use venue_core::traits::PaginatedResponse;
use venue_core::AppError;

/// Create a facility
///
/// POST /v1/facilities
#[instrument(skip(state, caller, req))]
pub async fn create_facility(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<CreateFacilityRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Facility validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let facility = state
        .facilities
        .create_facility(caller.requester(), req.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(facility)))
}

/// List facilities
///
/// GET /v1/facilities
#[instrument(skip(state))]
pub async fn list_facilities(
    state: web::Data<AppState>,
    filters: web::Query<FacilityQueryParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let filter = FacilityFilter::from(&*filters);
    let pagination = page.pagination();

    let facilities = state.facilities.list_facilities(&filter, pagination).await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(facilities, pagination)))
}

/// Get a facility
///
/// GET /v1/facilities/{id}
#[instrument(skip(state))]
pub async fn get_facility(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let facility = state.facilities.get_facility(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(facility)))
}

/// Toggle facility availability
///
/// PATCH /v1/facilities/{id}
#[instrument(skip(state, caller))]
pub async fn update_facility(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    req: web::Json<UpdateFacilityRequest>,
) -> Result<HttpResponse, AppError> {
    let facility = state
        .facilities
        .set_availability(caller.requester(), path.into_inner(), req.available)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(facility)))
}

/// Effective opening hours per day
///
/// GET /v1/facilities/{id}/schedule?from=YYYY-MM-DD&to=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn get_schedule(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ScheduleQuery>,
) -> Result<HttpResponse, AppError> {
    let facility_id = path.into_inner();
    let days = state
        .facilities
        .schedule(facility_id, query.from, query.to)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ScheduleResponse {
        facility_id,
        from: query.from,
        to: query.to,
        days,
    })))
}

/// List a facility's overrides
///
/// GET /v1/facilities/{id}/overrides
#[instrument(skip(state))]
pub async fn list_overrides(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let overrides = state.facilities.list_overrides(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(overrides)))
}

/// Create an override
///
/// POST /v1/facilities/{id}/overrides
#[instrument(skip(state, caller, req))]
pub async fn create_override(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    req: web::Json<CreateOverrideRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Override validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let created = state
        .facilities
        .create_override(caller.requester(), req.into_inner().into_new(path.into_inner()))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}

/// Delete an override
///
/// DELETE /v1/facilities/{id}/overrides/{override_id}
#[instrument(skip(state, caller))]
pub async fn delete_override(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (facility_id, override_id) = path.into_inner();
    state
        .facilities
        .delete_override(caller.requester(), facility_id, override_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Configure facility routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/facilities")
            .route("", web::get().to(list_facilities))
            .route("", web::post().to(create_facility))
            .route("/{id}", web::get().to(get_facility))
            .route("/{id}", web::patch().to(update_facility))
            .route("/{id}/schedule", web::get().to(get_schedule))
            .route("/{id}/overrides", web::get().to(list_overrides))
            .route("/{id}/overrides", web::post().to(create_override))
            .route("/{id}/overrides/{override_id}", web::delete().to(delete_override)),
    );
}

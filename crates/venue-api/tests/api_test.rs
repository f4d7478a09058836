//! HTTP routes against the in-memory backend

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use venue_api::caller::{USER_ID_HEADER, USER_ROLES_HEADER};
use venue_api::{configure_routes, AppState};
use venue_services::{BookingService, FacilityService};
use venue_test_utils::{InMemoryBackend, RecordingNotifier, ScriptedPaymentGateway};

struct TestContext {
    backend: InMemoryBackend,
    gateway: Arc<ScriptedPaymentGateway>,
    state: AppState,
}

fn context() -> TestContext {
    let backend = InMemoryBackend::new();
    let gateway = Arc::new(ScriptedPaymentGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let bookings = Arc::new(BookingService::new(
        backend.facilities.clone(),
        backend.bookings.clone(),
        backend.retries.clone(),
        gateway.clone(),
        notifier,
    ));
    let facilities = Arc::new(FacilityService::new(
        backend.facilities.clone(),
        backend.overrides.clone(),
    ));

    TestContext {
        backend,
        gateway,
        state: AppState::new(bookings, facilities),
    }
}

macro_rules! app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn admin_headers(req: test::TestRequest) -> test::TestRequest {
    req.insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
        .insert_header((USER_ROLES_HEADER, "ADMIN"))
}

fn member_headers(req: test::TestRequest, user_id: Uuid) -> test::TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
        .insert_header((USER_ROLES_HEADER, "MEMBER"))
}

fn facility_body() -> Value {
    json!({
        "venueId": Uuid::new_v4(),
        "name": "Court A",
        "openAt": "08:00",
        "closeAt": "22:00",
        "weekdayRateCents": 4500,
        "weekendRateCents": 6000,
        "currency": "CAD",
    })
}

#[actix_web::test]
async fn test_booking_lifecycle_over_http() {
    let ctx = context();
    let app = app!(ctx);
    let member = Uuid::new_v4();

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::post().uri("/v1/facilities"))
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let facility_id = body["data"]["id"].as_str().unwrap().to_string();

    // Charge fails: slot held, 202
    ctx.gateway.fail_with("card declined");
    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::post().uri("/v1/bookings"), member)
            .set_json(json!({
                "facilityId": facility_id,
                "startsAt": "2024-07-01T09:00:00Z",
                "endsAt": "2024-07-01T10:30:00Z",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["amountCents"], 9000);
    assert_eq!(body["data"]["status"], "PAYMENT_RETRY");
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ctx.backend.retries.len(), 1);

    // Overlap is a conflict
    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::post().uri("/v1/bookings"), member)
            .set_json(json!({
                "facilityId": facility_id,
                "startsAt": "2024-07-01T10:00:00Z",
                "endsAt": "2024-07-01T11:00:00Z",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "booking_conflict");

    // Another member cannot see it
    let resp = test::call_service(
        &app,
        member_headers(
            test::TestRequest::get().uri(&format!("/v1/bookings/{}", booking_id)),
            Uuid::new_v4(),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Owner lists their bookings
    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::get().uri("/v1/bookings?limit=5"), member).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["count"], 1);
    assert_eq!(body["pagination"]["limit"], 5);

    // Cancel twice
    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            member_headers(
                test::TestRequest::delete().uri(&format!("/v1/bookings/{}", booking_id)),
                member,
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "CANCELLED");
        assert_eq!(body["data"]["amountCents"], 9000);
    }
    assert!(ctx.backend.retries.is_empty());
}

#[actix_web::test]
async fn test_confirmed_booking_returns_created() {
    let ctx = context();
    let app = app!(ctx);

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::post().uri("/v1/facilities"))
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let facility_id = body["data"]["id"].as_str().unwrap().to_string();

    ctx.gateway.succeed_with("pi_ok");
    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::post().uri("/v1/bookings"), Uuid::new_v4())
            .set_json(json!({
                "facilityId": facility_id,
                "startsAt": "2024-07-06T09:00:00Z",
                "endsAt": "2024-07-06T10:00:00Z",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "CONFIRMED");
    assert_eq!(body["data"]["paymentIntent"], "pi_ok");
    // Saturday
    assert_eq!(body["data"]["amountCents"], 6000);
}

#[actix_web::test]
async fn test_schedule_with_closure() {
    let ctx = context();
    let app = app!(ctx);

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::post().uri("/v1/facilities"))
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let facility_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        admin_headers(
            test::TestRequest::post().uri(&format!("/v1/facilities/{}/overrides", facility_id)),
        )
        .set_json(json!({
            "startDate": "2024-07-04",
            "endDate": "2024-07-04",
            "allDay": true,
            "reason": "Independence Day",
        }))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/v1/facilities/{}/schedule?from=2024-07-03&to=2024-07-05",
                facility_id
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let days = body["data"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["closed"], false);
    assert_eq!(days[0]["slots"][0]["openAt"], "08:00");
    assert_eq!(days[1]["closed"], true);
    assert_eq!(days[1]["reason"], "Independence Day");
    assert_eq!(days[1]["slots"].as_array().unwrap().len(), 0);
    assert_eq!(days[2]["closed"], false);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/v1/facilities/{}/schedule?from=2024-07-05&to=2024-07-03",
                facility_id
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_override_management_requires_elevation() {
    let ctx = context();
    let app = app!(ctx);

    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::post().uri("/v1/facilities"), Uuid::new_v4())
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/v1/facilities")
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::post().uri("/v1/facilities"))
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let facility_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        admin_headers(
            test::TestRequest::post().uri(&format!("/v1/facilities/{}/overrides", facility_id)),
        )
        .set_json(json!({
            "startDate": "2024-07-10",
            "endDate": "2024-07-01",
            "allDay": true,
        }))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::delete().uri(&format!(
            "/v1/facilities/{}/overrides/{}",
            facility_id,
            Uuid::new_v4()
        )))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_unavailable_facility_rejects_members() {
    let ctx = context();
    let app = app!(ctx);

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::post().uri("/v1/facilities"))
            .set_json(facility_body())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let facility_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        admin_headers(test::TestRequest::patch().uri(&format!("/v1/facilities/{}", facility_id)))
            .set_json(json!({ "available": false }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        member_headers(test::TestRequest::post().uri("/v1/bookings"), Uuid::new_v4())
            .set_json(json!({
                "facilityId": facility_id,
                "startsAt": "2024-07-01T09:00:00Z",
                "endsAt": "2024-07-01T10:00:00Z",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "facility_unavailable");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/facilities?available=true").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["count"], 0);
}

#[actix_web::test]
async fn test_health_route() {
    let ctx = context();
    let app = app!(ctx);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/v1/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

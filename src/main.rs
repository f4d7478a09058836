//! Venue booking service
//!
//! Serves the booking API and runs the payment retry worker in the same
//! process. The worker stops when the HTTP server shuts down.

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpResponse, HttpServer};
use std::env;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use venue_api::{configure_routes, AppState};
use venue_core::traits::{
    BookingRepository, FacilityRepository, Notifier, OverrideRepository, PaymentGateway,
    PaymentRetryRepository,
};
use venue_core::AppConfig;
use venue_db::{
    run_migrations, wait_for_pool, PgBookingRepository, PgFacilityRepository,
    PgOverrideRepository, PgPaymentRetryRepository,
};
use venue_services::{
    BookingService, FacilityService, HttpNotifier, HttpPaymentGateway, PaymentRetryWorker,
};

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "venue_booking={lvl},venue_api={lvl},venue_services={lvl},venue_db={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting venue booking service v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    info!("Waiting for database...");
    let pool = wait_for_pool(&config.database)
        .await
        .map_err(|e| startup_error("Database unavailable", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Migrations failed", e))?;
    info!(
        "Database ready with {} max connections",
        config.database.max_connections
    );

    let facilities: Arc<dyn FacilityRepository> = Arc::new(PgFacilityRepository::new(pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(pool.clone()));
    let overrides: Arc<dyn OverrideRepository> = Arc::new(PgOverrideRepository::new(pool.clone()));
    let retries: Arc<dyn PaymentRetryRepository> =
        Arc::new(PgPaymentRetryRepository::new(pool.clone()));

    let payments: Arc<dyn PaymentGateway> = Arc::new(
        HttpPaymentGateway::from_config(&config.payment)
            .map_err(|e| startup_error("Payment client", e))?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(
        HttpNotifier::from_config(&config.notification)
            .map_err(|e| startup_error("Notification client", e))?,
    );

    let worker = Arc::new(
        PaymentRetryWorker::new(
            bookings.clone(),
            retries.clone(),
            payments.clone(),
            notifier.clone(),
            config.retry.clone(),
        )
        .with_notification_channel(config.notification.channel.clone()),
    );

    let booking_service = Arc::new(
        BookingService::new(
            facilities.clone(),
            bookings,
            retries,
            payments,
            notifier,
        )
        .with_policy(worker.policy())
        .with_config(config.booking.clone())
        .with_notification_channel(config.notification.channel.clone()),
    );
    let facility_service = Arc::new(FacilityService::new(facilities, overrides));
    facility_service
        .seed_default_facility(&config.seed)
        .await
        .map_err(|e| startup_error("Seeding default facility failed", e))?;
    let state = AppState::new(booking_service, facility_service);

    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    let server = HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| cors_origins_inner.split(',').any(|allowed| allowed.trim() == o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-user-id"),
                header::HeaderName::from_static("x-user-roles"),
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_body",
                        "message": message,
                        "status": 400,
                    })),
                )
                .into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": message,
                        "status": 400,
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.server.workers)
    .client_request_timeout(std::time::Duration::from_secs(config.server.timeout_secs))
    .bind(&bind_addr)?
    .run();

    let result = server.await;

    info!("HTTP server stopped, shutting down payment retry worker");
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!("Payment retry worker ended abnormally: {}", e);
    }

    result
}

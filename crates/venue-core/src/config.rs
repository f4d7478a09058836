//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout() -> u64 {
    30
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How long startup waits for the database to accept connections
    #[serde(default = "default_startup_wait")]
    pub startup_wait_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_startup_wait() -> u64 {
    60
}

/// Payment service client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    #[serde(default = "default_payment_url")]
    pub base_url: String,

    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

fn default_payment_url() -> String {
    "http://payment-service:8080".to_string()
}

fn default_client_timeout() -> u64 {
    5
}

/// Notification service client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_url")]
    pub base_url: String,

    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,

    /// Delivery channel used for booking notifications
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_notification_url() -> String {
    "http://notification-service:8080".to_string()
}

fn default_channel() -> String {
    "in_app".to_string()
}

/// Payment retry worker configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Seconds between polls of the retry table
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum due retries processed per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Total charge attempts, including the synchronous one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first scheduled retry
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Upper bound on a single charge call from the worker
    #[serde(default = "default_charge_timeout")]
    pub charge_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_batch_size() -> i64 {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    60
}

fn default_charge_timeout() -> u64 {
    10
}

/// Booking request configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Longest interval a single booking may span
    #[serde(default = "default_max_duration_hours")]
    pub max_duration_hours: i64,

    /// Upper bound on the synchronous charge call
    #[serde(default = "default_charge_timeout")]
    pub charge_timeout_secs: u64,
}

fn default_max_duration_hours() -> i64 {
    24
}

/// Default facility ensured at startup
#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,

    #[serde(default = "default_seed_venue")]
    pub venue_id: Uuid,

    #[serde(default = "default_seed_facility")]
    pub facility_id: Uuid,
}

fn default_seed_enabled() -> bool {
    true
}

fn default_seed_venue() -> Uuid {
    Uuid::from_u128(0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa)
}

fn default_seed_facility() -> Uuid {
    Uuid::from_u128(0xbbbbbbbb_bbbb_bbbb_bbbb_bbbbbbbbbbbb)
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_seed_enabled(),
            venue_id: default_seed_venue(),
            facility_id: default_seed_facility(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.timeout_secs", 30)?
            .set_default("database.max_connections", 20)?
            .set_default("database.startup_wait_secs", 60)?
            .set_default("payment.base_url", "http://payment-service:8080")?
            .set_default("payment.timeout_secs", 5)?
            .set_default("notification.base_url", "http://notification-service:8080")?
            .set_default("notification.timeout_secs", 5)?
            .set_default("notification.channel", "in_app")?
            .set_default("retry.poll_interval_secs", 30)?
            .set_default("retry.batch_size", 10)?
            .set_default("retry.max_attempts", 5)?
            .set_default("retry.base_delay_secs", 60)?
            .set_default("retry.charge_timeout_secs", 10)?
            .set_default("booking.max_duration_hours", 24)?
            .set_default("booking.charge_timeout_secs", 10)?
            .set_default("seed.enabled", true)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with VENUE_ prefix
            .add_source(
                Environment::with_prefix("VENUE")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain DATABASE_URL as used by sqlx tooling
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("VENUE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: default_payment_url(),
            timeout_secs: default_client_timeout(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            base_url: default_notification_url(),
            timeout_secs: default_client_timeout(),
            channel: default_channel(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
            charge_timeout_secs: default_charge_timeout(),
        }
    }
}

impl RetryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn charge_timeout(&self) -> Duration {
        Duration::from_secs(self.charge_timeout_secs)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_duration_hours: default_max_duration_hours(),
            charge_timeout_secs: default_charge_timeout(),
        }
    }
}

impl BookingConfig {
    pub fn charge_timeout(&self) -> Duration {
        Duration::from_secs(self.charge_timeout_secs)
    }
}

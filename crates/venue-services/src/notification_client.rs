//! HTTP client for the notification service

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, instrument};
use uuid::Uuid;
use venue_core::config::NotificationConfig;
use venue_core::traits::Notifier;
use venue_core::{AppError, AppResult};

const NOTIFICATIONS_PATH: &str = "/v1/notifications";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendNotificationRequest<'a> {
    user_id: Uuid,
    title: &'a str,
    message: &'a str,
    channel: &'a str,
}

/// Notifier backed by the notification service's REST API
pub struct HttpNotifier {
    http_client: Client,
    notifications_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build notification client: {}", e)))?;

        Ok(Self {
            http_client,
            notifications_url: format!("{}{}", base_url.trim_end_matches('/'), NOTIFICATIONS_PATH),
        })
    }

    pub fn from_config(config: &NotificationConfig) -> AppResult<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, message), fields(user_id = %user_id))]
    async fn notify(&self, user_id: Uuid, title: &str, message: &str, channel: &str) -> AppResult<()> {
        let request = SendNotificationRequest {
            user_id,
            title,
            message,
            channel,
        };

        let response = self
            .http_client
            .post(&self.notifications_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            error!("Notification service HTTP error: status={}", status);
            return Err(AppError::Notification(format!(
                "notification service returned {}",
                status.as_u16()
            )));
        }

        Ok(())
    }
}

//! HTTP client for the payment service

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument};
use venue_core::config::PaymentConfig;
use venue_core::traits::{PaymentGateway, PaymentIntent};
use venue_core::{AppError, AppResult};

const INTENTS_PATH: &str = "/v1/payments/intents";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentRequest<'a> {
    amount_cents: i64,
    currency: &'a str,
    metadata: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CreateIntentResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

/// Payment gateway backed by the payment service's REST API
pub struct HttpPaymentGateway {
    http_client: Client,
    intents_url: String,
    timeout_secs: u64,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = ClientBuilder::new()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build payment client: {}", e)))?;

        Ok(Self {
            http_client,
            intents_url: format!("{}{}", base_url.trim_end_matches('/'), INTENTS_PATH),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &PaymentConfig) -> AppResult<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn intents_url(&self) -> &str {
        &self.intents_url
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, metadata))]
    async fn charge(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> AppResult<PaymentIntent> {
        let request = CreateIntentRequest {
            amount_cents,
            currency,
            metadata,
        };

        let response = self
            .http_client
            .post(&self.intents_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::PaymentTimeout(self.timeout_secs)
                } else {
                    AppError::Payment(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Payment service HTTP error: status={} body={}", status, body);
            return Err(AppError::Payment(format!(
                "payment service returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let intent: CreateIntentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("invalid payment response: {}", e)))?;

        debug!("Payment intent created: {}", intent.id);

        Ok(PaymentIntent {
            id: intent.id,
            status: intent.status,
        })
    }
}

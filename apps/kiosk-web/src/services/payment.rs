use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;

const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(20);

/// Provider-side payment state as seen by the status poller. Statuses
/// outside the known sets are passed through to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    Confirmed,
    Pending,
    Other(String),
}

pub fn classify_status(status: &str) -> PaymentState {
    match status {
        "successful" | "success" | "completed" | "paid" | "confirmed" => PaymentState::Confirmed,
        "pending" | "processing" | "created" => PaymentState::Pending,
        other => PaymentState::Other(other.to_string()),
    }
}

#[derive(Serialize)]
struct CreateTransactionRequest<'a> {
    #[serde(rename = "paymentMethod")]
    payment_method: u32,
    id: &'a str,
    #[serde(rename = "paymentDetails")]
    payment_details: PaymentDetails,
    description: &'a str,
    #[serde(rename = "return")]
    return_url: String,
    #[serde(rename = "failedUrl")]
    failed_url: String,
    payload: &'a str,
}

#[derive(Serialize)]
struct PaymentDetails {
    amount: i64,
    currency: &'static str,
}

#[derive(Deserialize)]
struct CreateTransactionResponse {
    redirect: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: Option<String>,
}

/// Platega HTTP client. Both calls are synchronous request/response with
/// bounded timeouts; callers treat any failure as transient.
#[derive(Clone)]
pub struct PlategaClient {
    http: reqwest::Client,
    merchant_id: String,
    api_key: String,
    create_url: String,
    status_url: String,
    site_url: String,
}

impl PlategaClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            merchant_id: config.platega_merchant_id.clone(),
            api_key: config.platega_api_key.clone(),
            create_url: config.platega_create_url.clone(),
            status_url: config.platega_status_url.clone(),
            site_url: config.site_url.clone(),
        }
    }

    /// Creates a provider transaction and returns the redirect URL the
    /// buyer must be sent to. No redirect in the response is a failure:
    /// checkout aborts and nothing is recorded.
    pub async fn create_transaction(&self, payment_id: &str, amount: i64) -> Result<String> {
        let request = CreateTransactionRequest {
            payment_method: 2, // SBP
            id: payment_id,
            payment_details: PaymentDetails {
                amount,
                currency: "RUB",
            },
            description: "Storefront order",
            return_url: format!("{}/payment/{}", self.site_url, payment_id),
            failed_url: format!("{}/payment/{}?failed=1", self.site_url, payment_id),
            payload: "ORDER_PAYLOAD",
        };

        info!("creating provider transaction {} for {}", payment_id, amount);

        let response = self
            .http
            .post(&self.create_url)
            .timeout(CREATE_TIMEOUT)
            .header("X-MerchantId", &self.merchant_id)
            .header("X-Secret", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Payment create request failed")?;

        let data: CreateTransactionResponse = response
            .json()
            .await
            .context("Payment create response was not JSON")?;

        data.redirect
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Payment provider returned no redirect URL"))
    }

    /// Polls the provider for the transaction status, lowercased so the
    /// caller can classify it.
    pub async fn check_status(&self, payment_id: &str) -> Result<String> {
        let url = self.status_url.replace("{payment_id}", payment_id);

        let response = self
            .http
            .get(&url)
            .timeout(STATUS_TIMEOUT)
            .header("X-MerchantId", &self.merchant_id)
            .header("X-Secret", &self.api_key)
            .send()
            .await
            .context("Payment status request failed")?;

        let data: StatusResponse = response
            .json()
            .await
            .context("Payment status response was not JSON")?;

        Ok(data.status.unwrap_or_default().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_synonyms_map_to_confirmed() {
        for status in ["successful", "success", "completed", "paid", "confirmed"] {
            assert_eq!(classify_status(status), PaymentState::Confirmed);
        }
    }

    #[test]
    fn in_flight_statuses_map_to_pending() {
        for status in ["pending", "processing", "created"] {
            assert_eq!(classify_status(status), PaymentState::Pending);
        }
    }

    #[test]
    fn unknown_statuses_pass_through() {
        assert_eq!(
            classify_status("cancelled"),
            PaymentState::Other("cancelled".to_string())
        );
        assert_eq!(classify_status(""), PaymentState::Other(String::new()));
    }
}

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::PaymentConfig,
    errors::{AppError, Result},
};

const PAYMENT_FAILURE_MESSAGE: &str = "Payment initiation failed";

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    public_key: &'a str,
    amount: u32,
    currency: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    api_ref: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    url: Option<String>,
}

pub struct SubscriptionPeriod {
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// IntaSend hosted-checkout client.
pub struct PaymentService {
    client: Client,
    config: PaymentConfig,
    frontend_url: String,
}

impl PaymentService {
    pub fn new(config: PaymentConfig, frontend_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            frontend_url,
        })
    }

    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        email: &str,
        amount: Option<u32>,
        phone_number: Option<&str>,
    ) -> Result<String> {
        if self.config.public_key.is_empty() {
            return Err(AppError::upstream(
                "INTASEND_PUBLIC_KEY is not configured",
                PAYMENT_FAILURE_MESSAGE,
            ));
        }

        let request = CheckoutRequest {
            public_key: &self.config.public_key,
            amount: amount.unwrap_or(self.config.subscription_amount),
            currency: &self.config.currency,
            email,
            phone_number,
            api_ref: user_id.to_string(),
            redirect_url: format!("{}/payment-success", self.frontend_url),
        };

        let response = self
            .client
            .post(format!("{}/api/v1/checkout/", self.config.api_base))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Checkout request failed: {}", e), PAYMENT_FAILURE_MESSAGE))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                format!("Checkout returned {}: {}", status, body),
                PAYMENT_FAILURE_MESSAGE,
            ));
        }

        let checkout: CheckoutResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to parse checkout response: {}", e), PAYMENT_FAILURE_MESSAGE))?;

        checkout
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::upstream("Checkout response has no url", PAYMENT_FAILURE_MESSAGE))
    }

    /// Callbacks carry the shared challenge configured on the dashboard.
    /// Without a configured challenge every callback is refused.
    pub fn verify_challenge(&self, challenge: Option<&str>) -> bool {
        matches!(
            (self.config.webhook_challenge.as_deref(), challenge),
            (Some(expected), Some(given)) if expected == given
        )
    }

    pub fn subscription_period(&self, now: DateTime<Utc>) -> SubscriptionPeriod {
        SubscriptionPeriod {
            starts_at: now,
            expires_at: now + Duration::days(self.config.subscription_days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(challenge: Option<&str>) -> PaymentConfig {
        PaymentConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            public_key: String::new(),
            webhook_challenge: challenge.map(str::to_string),
            subscription_amount: 500,
            subscription_days: 30,
            currency: "KES".to_string(),
        }
    }

    #[test]
    fn test_verify_challenge() {
        let service = PaymentService::new(config(Some("s3cret")), String::new()).unwrap();
        assert!(service.verify_challenge(Some("s3cret")));
        assert!(!service.verify_challenge(Some("guess")));
        assert!(!service.verify_challenge(None));

        let unconfigured = PaymentService::new(config(None), String::new()).unwrap();
        assert!(!unconfigured.verify_challenge(Some("anything")));
    }

    #[test]
    fn test_subscription_period() {
        let service = PaymentService::new(config(None), String::new()).unwrap();
        let now = Utc::now();
        let period = service.subscription_period(now);
        assert_eq!(period.starts_at, now);
        assert_eq!(period.expires_at - now, Duration::days(30));
    }

    #[tokio::test]
    async fn test_checkout_requires_public_key() {
        let service = PaymentService::new(config(None), String::new()).unwrap();
        let err = service
            .create_checkout(Uuid::new_v4(), "a@example.com", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[test]
    fn test_checkout_request_shape() {
        let request = CheckoutRequest {
            public_key: "ISPubKey_test",
            amount: 500,
            currency: "KES",
            email: "a@example.com",
            phone_number: None,
            api_ref: "ref".to_string(),
            redirect_url: "http://localhost:3000/payment-success".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount"], 500);
        assert_eq!(value["currency"], "KES");
        assert!(value.get("phone_number").is_none());
    }
}

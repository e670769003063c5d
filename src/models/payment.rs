use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    pub amount: Option<u32>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub payment_url: String,
}

/// Collection callback as posted by IntaSend. Fields we do not act on are
/// kept loose so schema additions on their side never break parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWebhook {
    pub invoice_id: String,
    pub state: String,
    #[serde(default)]
    pub api_ref: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub failed_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Processing,
    Complete,
    Failed,
    Unknown,
}

impl PaymentState {
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_uppercase().as_str() {
            "PENDING" => PaymentState::Pending,
            "PROCESSING" => PaymentState::Processing,
            "COMPLETE" | "COMPLETED" => PaymentState::Complete,
            "FAILED" => PaymentState::Failed,
            _ => PaymentState::Unknown,
        }
    }
}

impl PaymentWebhook {
    pub fn payment_state(&self) -> PaymentState {
        PaymentState::parse(&self.state)
    }

    /// Checkouts are created with the paying user's id as `api_ref`.
    pub fn user_id(&self) -> Option<Uuid> {
        self.api_ref
            .as_deref()
            .and_then(|r| Uuid::parse_str(r.trim()).ok())
    }
}

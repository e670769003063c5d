use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::json;

use crate::{
    database::queries::UserQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{PaymentState, PaymentWebhook, SubscribeRequest, SubscribeResponse},
};

pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Option<Json<SubscribeRequest>>,
) -> Result<Json<SubscribeResponse>> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let phone_number = request
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    if let Some(phone) = phone_number {
        UserQueries::set_phone_number(state.database.pool(), user.id, phone).await?;
    }

    let payment_url = state
        .payments
        .create_checkout(user.id, &user.user.email, request.amount, phone_number)
        .await?;

    tracing::info!(user_id = %user.id, "checkout created");
    Ok(Json(SubscribeResponse { payment_url }))
}

/// IntaSend retries until it sees a 2xx, so every authentic callback is
/// acknowledged even when nothing changes.
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<Json<serde_json::Value>> {
    if !state.payments.verify_challenge(payload.challenge.as_deref()) {
        tracing::warn!(invoice_id = %payload.invoice_id, "Rejected webhook with bad challenge");
        return Err(AppError::Auth("Invalid webhook challenge".to_string()));
    }

    match payload.payment_state() {
        PaymentState::Complete => match payload.user_id() {
            Some(user_id) => {
                let period = state.payments.subscription_period(Utc::now());
                let applied = UserQueries::activate_subscription(
                    state.database.pool(),
                    user_id,
                    &payload.invoice_id,
                    period.starts_at,
                    period.expires_at,
                )
                .await?;

                if applied {
                    tracing::info!(%user_id, invoice_id = %payload.invoice_id, "subscription activated");
                } else {
                    tracing::info!(
                        %user_id,
                        invoice_id = %payload.invoice_id,
                        "invoice already applied or user unknown"
                    );
                }
            }
            None => {
                tracing::warn!(
                    invoice_id = %payload.invoice_id,
                    "Completed payment without a user reference"
                );
            }
        },
        PaymentState::Failed => {
            tracing::warn!(
                invoice_id = %payload.invoice_id,
                reason = payload.failed_reason.as_deref().unwrap_or("unknown"),
                "payment failed"
            );
        }
        other => {
            tracing::debug!(invoice_id = %payload.invoice_id, state = ?other, "payment update");
        }
    }

    Ok(Json(json!({ "received": true })))
}

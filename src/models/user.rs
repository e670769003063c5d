use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verification_token_hash: Option<String>,
    pub is_paid: bool,
    pub subscription_date: Option<DateTime<Utc>>,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub intasend_invoice_id: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Paid and not yet expired. A paid flag without an expiry counts as active.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.is_paid && self.subscription_expiry.map_or(true, |expiry| expiry > now)
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_paid: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let is_paid = user.has_active_subscription(Utc::now());
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
            is_paid,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub is_paid: bool,
    pub subscription_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(is_paid: bool, expiry: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "wanjiru".to_string(),
            email: "wanjiru@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_verified: true,
            verification_token_hash: None,
            is_paid,
            subscription_date: None,
            subscription_expiry: expiry,
            intasend_invoice_id: None,
            phone_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_subscription() {
        let now = Utc::now();
        assert!(user(true, Some(now + Duration::days(3))).has_active_subscription(now));
        assert!(user(true, None).has_active_subscription(now));
        assert!(!user(true, Some(now - Duration::days(1))).has_active_subscription(now));
        assert!(!user(false, Some(now + Duration::days(3))).has_active_subscription(now));
    }

    #[test]
    fn test_user_response_hides_credentials() {
        let response = UserResponse::from(user(false, None));
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["is_paid"], false);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SPEAKER_USER: &str = "user";
pub const SPEAKER_ASSISTANT: &str = "assistant";

/// One stored message. The speaker tag is kept exactly as written so older
/// records with other tags survive untouched.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            speaker: SPEAKER_USER.to_string(),
            text: text.into(),
            created_at,
        }
    }

    pub fn assistant(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            speaker: SPEAKER_ASSISTANT.to_string(),
            text: text.into(),
            created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Turn>,
}

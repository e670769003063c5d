use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_JOURNAL_TITLE: &str = "Untitled Entry";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub title: String,
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateJournalRequest {
    pub content: Option<String>,
    pub title: Option<String>,
    pub emotion: Option<String>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJournalRequest {
    pub content: Option<String>,
    pub title: Option<String>,
    pub emotion: Option<String>,
}

/// Validated, trimmed values ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    pub content: String,
    pub title: String,
    pub emotion: Option<String>,
}

/// `None` keeps the stored column. `emotion: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalChanges {
    pub content: Option<String>,
    pub title: Option<String>,
    pub emotion: Option<Option<String>>,
}

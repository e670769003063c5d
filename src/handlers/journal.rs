use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::queries::JournalQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        CreateJournalRequest, JournalChanges, JournalEntry, NewJournalEntry,
        UpdateJournalRequest, DEFAULT_JOURNAL_TITLE,
    },
};

const MAX_CONTENT_CHARS: usize = 20_000;
const MAX_TITLE_CHARS: usize = 200;

pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<JournalEntry>>> {
    let entries = JournalQueries::list_by_owner(state.database.pool(), user.id).await?;
    Ok(Json(entries))
}

pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateJournalRequest>,
) -> Result<(StatusCode, Json<JournalEntry>)> {
    let entry = validate_new_entry(request)?;
    let created = JournalQueries::create(state.database.pool(), user.id, &entry).await?;

    tracing::debug!(user_id = %user.id, entry_id = %created.id, "journal entry created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateJournalRequest>,
) -> Result<Json<JournalEntry>> {
    let changes = validate_changes(request)?;
    owned_entry(&state, user.id, id, "update").await?;

    let updated = JournalQueries::update(state.database.pool(), id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;

    Ok(Json(updated))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    owned_entry(&state, user.id, id, "delete").await?;

    if !JournalQueries::delete(state.database.pool(), id).await? {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }

    Ok(Json(json!({ "message": "Entry removed" })))
}

async fn owned_entry(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    action: &str,
) -> Result<JournalEntry> {
    let entry = JournalQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;

    if entry.user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this entry",
            action
        )));
    }

    Ok(entry)
}

fn validate_new_entry(request: CreateJournalRequest) -> Result<NewJournalEntry> {
    let content = request
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Journal content is required.".to_string()))?;
    check_length("content", content, MAX_CONTENT_CHARS)?;

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_JOURNAL_TITLE);
    check_length("title", title, MAX_TITLE_CHARS)?;

    Ok(NewJournalEntry {
        content: content.to_string(),
        title: title.to_string(),
        emotion: non_blank(request.emotion),
    })
}

fn validate_changes(request: UpdateJournalRequest) -> Result<JournalChanges> {
    let content = match request.content.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::Validation(
                "Journal content is required.".to_string(),
            ))
        }
        Some(content) => {
            check_length("content", content, MAX_CONTENT_CHARS)?;
            Some(content.to_string())
        }
        None => None,
    };

    let title = match request.title.as_deref().map(str::trim) {
        Some("") => Some(DEFAULT_JOURNAL_TITLE.to_string()),
        Some(title) => {
            check_length("title", title, MAX_TITLE_CHARS)?;
            Some(title.to_string())
        }
        None => None,
    };

    let emotion = request.emotion.map(|e| non_blank(Some(e)));

    Ok(JournalChanges {
        content,
        title,
        emotion,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "Journal {} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(content: Option<&str>, title: Option<&str>, emotion: Option<&str>) -> CreateJournalRequest {
        CreateJournalRequest {
            content: content.map(String::from),
            title: title.map(String::from),
            emotion: emotion.map(String::from),
        }
    }

    #[test]
    fn test_new_entry_defaults_title() {
        let entry = validate_new_entry(create(Some("  felt calm today "), None, Some("calm"))).unwrap();
        assert_eq!(entry.content, "felt calm today");
        assert_eq!(entry.title, DEFAULT_JOURNAL_TITLE);
        assert_eq!(entry.emotion.as_deref(), Some("calm"));

        let blank_title = validate_new_entry(create(Some("text"), Some("   "), Some(" "))).unwrap();
        assert_eq!(blank_title.title, DEFAULT_JOURNAL_TITLE);
        assert_eq!(blank_title.emotion, None);
    }

    #[test]
    fn test_new_entry_requires_content() {
        assert!(matches!(
            validate_new_entry(create(None, Some("t"), None)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_new_entry(create(Some(" \n "), None, None)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_new_entry_length_limits() {
        let long_title = "t".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_new_entry(create(Some("ok"), Some(&long_title), None)).is_err());

        let long_content = "c".repeat(MAX_CONTENT_CHARS + 1);
        assert!(validate_new_entry(create(Some(&long_content), None, None)).is_err());
    }

    #[test]
    fn test_changes_keep_absent_fields() {
        let changes = validate_changes(UpdateJournalRequest::default()).unwrap();
        assert_eq!(changes, JournalChanges::default());
    }

    #[test]
    fn test_changes_normalize_provided_fields() {
        let changes = validate_changes(UpdateJournalRequest {
            content: Some(" revised ".to_string()),
            title: Some("".to_string()),
            emotion: Some("  ".to_string()),
        })
        .unwrap();

        assert_eq!(changes.content.as_deref(), Some("revised"));
        assert_eq!(changes.title.as_deref(), Some(DEFAULT_JOURNAL_TITLE));
        assert_eq!(changes.emotion, Some(None));
    }

    #[test]
    fn test_changes_reject_blank_content() {
        let result = validate_changes(UpdateJournalRequest {
            content: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

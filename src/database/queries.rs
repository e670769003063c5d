use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use crate::models::*;
use crate::errors::{AppError, Result};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .as_deref()
        == Some(UNIQUE_VIOLATION)
}

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        verification_token_hash: &str,
    ) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, verification_token_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(verification_token_hash)
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent signup for the same name or email.
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Validation("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn exists_with_username_or_email(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Marks the owner of `token_hash` verified and clears the token in one
    /// statement, so a token can only ever be consumed once.
    pub async fn consume_verification_token(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET is_verified = TRUE, verification_token_hash = NULL, updated_at = NOW()
            WHERE verification_token_hash = $1
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user_id)
    }

    pub async fn set_phone_number(pool: &PgPool, id: Uuid, phone_number: &str) -> Result<()> {
        sqlx::query("UPDATE users SET phone_number = $1, updated_at = NOW() WHERE id = $2")
            .bind(phone_number)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Returns false when the user is unknown or this invoice was already applied.
    pub async fn activate_subscription(
        pool: &PgPool,
        id: Uuid,
        invoice_id: &str,
        starts_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_paid = TRUE,
                subscription_date = $2,
                subscription_expiry = $3,
                intasend_invoice_id = $4,
                updated_at = NOW()
            WHERE id = $1 AND intasend_invoice_id IS DISTINCT FROM $4
            "#,
        )
        .bind(id)
        .bind(starts_at)
        .bind(expires_at)
        .bind(invoice_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct ConversationQueries;

impl ConversationQueries {
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Conversation>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM conversations WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        let Some(id) = id else {
            return Ok(None);
        };

        let turns = sqlx::query_as::<_, Turn>(
            r#"
            SELECT speaker, text, created_at
            FROM conversation_turns
            WHERE conversation_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(Conversation { id, user_id, turns }))
    }

    /// Idempotent: returns the existing conversation id when there is one.
    pub async fn create_empty(pool: &PgPool, user_id: Uuid) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO conversations (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Appends `turns` in order inside one transaction, creating the
    /// conversation record on first use.
    pub async fn append_turns(pool: &PgPool, user_id: Uuid, turns: &[Turn]) -> Result<()> {
        let mut tx = pool.begin().await?;

        let conversation_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO conversations (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for turn in turns {
            sqlx::query(
                r#"
                INSERT INTO conversation_turns (conversation_id, speaker, text, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(conversation_id)
            .bind(&turn.speaker)
            .bind(&turn.text)
            .bind(turn.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_by_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct JournalQueries;

impl JournalQueries {
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            "SELECT * FROM journal_entries WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        entry: &NewJournalEntry,
    ) -> Result<JournalEntry> {
        let created = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries (id, user_id, content, title, emotion)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&entry.content)
        .bind(&entry.title)
        .bind(&entry.emotion)
        .fetch_one(pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<JournalEntry>> {
        let entry = sqlx::query_as::<_, JournalEntry>("SELECT * FROM journal_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(entry)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: &JournalChanges,
    ) -> Result<Option<JournalEntry>> {
        let updated = sqlx::query_as::<_, JournalEntry>(
            r#"
            UPDATE journal_entries
            SET content = COALESCE($2, content),
                title = COALESCE($3, title),
                emotion = CASE WHEN $5 THEN $4 ELSE emotion END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.content)
        .bind(&changes.title)
        .bind(changes.emotion.clone().flatten())
        .bind(changes.emotion.is_some())
        .fetch_optional(pool)
        .await?;

        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    database::queries::ConversationQueries,
    errors::{AppError, Result},
    models::{ChatReply, Conversation, Turn},
    services::generation::{GenerationClient, GenerationMessage, Role},
};

const CHAT_FAILURE_MESSAGE: &str =
    "An unexpected server error occurred while processing the chat.";

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Conversation>>;

    async fn create_empty(&self, user_id: Uuid) -> Result<()>;

    /// Appends all turns or none of them.
    async fn append_turns(&self, user_id: Uuid, turns: &[Turn]) -> Result<()>;

    async fn clear(&self, user_id: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Conversation>> {
        ConversationQueries::find_by_user(&self.pool, user_id).await
    }

    async fn create_empty(&self, user_id: Uuid) -> Result<()> {
        ConversationQueries::create_empty(&self.pool, user_id).await?;
        Ok(())
    }

    async fn append_turns(&self, user_id: Uuid, turns: &[Turn]) -> Result<()> {
        ConversationQueries::append_turns(&self.pool, user_id, turns).await
    }

    async fn clear(&self, user_id: Uuid) -> Result<()> {
        ConversationQueries::delete_by_user(&self.pool, user_id).await?;
        Ok(())
    }
}

/// Outbound payload for the generation service: stored turns plus the new
/// one, blank turns dropped, speaker tags mapped onto the two roles.
/// Entries are never merged or reordered, so the payload may open with an
/// assistant entry or repeat a role when a blank turn sat between them.
pub fn build_payload(history: &[Turn], inbound: &Turn) -> Vec<GenerationMessage> {
    history
        .iter()
        .chain(std::iter::once(inbound))
        .filter(|turn| !turn.text.trim().is_empty())
        .map(|turn| GenerationMessage {
            role: Role::from_speaker(&turn.speaker),
            text: turn.text.clone(),
        })
        .collect()
}

/// Turns one inbound message into one persisted exchange. Nothing is written
/// unless the generation call succeeds.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn GenerationClient>,
    system_instruction: String,
    timeout: Duration,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn GenerationClient>,
        system_instruction: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            system_instruction: system_instruction.into(),
            timeout,
        }
    }

    pub async fn send_message(&self, user_id: Uuid, message: &str) -> Result<ChatReply> {
        let text = message.trim();
        if text.is_empty() {
            return Err(AppError::Validation(
                "Message content cannot be empty.".to_string(),
            ));
        }

        let history = self
            .store
            .find_by_user(user_id)
            .await?
            .map(|c| c.turns)
            .unwrap_or_default();

        let user_turn = Turn::user(text, Utc::now());
        let payload = build_payload(&history, &user_turn);

        tracing::debug!(%user_id, turns = payload.len(), "requesting generation");

        let generated = match tokio::time::timeout(
            self.timeout,
            self.generator.generate(&self.system_instruction, &payload),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                return Err(AppError::upstream(
                    format!("empty generation for user {user_id}"),
                    CHAT_FAILURE_MESSAGE,
                ))
            }
            Ok(Err(e)) => {
                return Err(AppError::upstream(
                    format!("generation failed for user {user_id}: {e}"),
                    CHAT_FAILURE_MESSAGE,
                ))
            }
            Err(_) => {
                return Err(AppError::upstream(
                    format!(
                        "generation for user {user_id} timed out after {:?}",
                        self.timeout
                    ),
                    CHAT_FAILURE_MESSAGE,
                ))
            }
        };

        let reply = Turn::assistant(generated, Utc::now());
        self.store
            .append_turns(user_id, &[user_turn, reply.clone()])
            .await?;

        Ok(ChatReply {
            response: reply.text,
            timestamp: reply.created_at,
        })
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<Turn>> {
        Ok(self
            .store
            .find_by_user(user_id)
            .await?
            .map(|c| c.turns)
            .unwrap_or_default())
    }

    pub async fn clear_history(&self, user_id: Uuid) -> Result<()> {
        self.store.clear(user_id).await
    }

    pub async fn start_conversation(&self, user_id: Uuid) -> Result<()> {
        self.store.create_empty(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generation::GenerationError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        conversations: Mutex<HashMap<Uuid, Vec<Turn>>>,
    }

    impl MemoryStore {
        fn with_turns(user_id: Uuid, turns: Vec<Turn>) -> Arc<Self> {
            let store = Self::default();
            store.conversations.lock().unwrap().insert(user_id, turns);
            Arc::new(store)
        }

        fn turns(&self, user_id: Uuid) -> Option<Vec<Turn>> {
            self.conversations.lock().unwrap().get(&user_id).cloned()
        }
    }

    #[async_trait]
    impl ConversationStore for MemoryStore {
        async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Conversation>> {
            Ok(self.turns(user_id).map(|turns| Conversation {
                id: user_id,
                user_id,
                turns,
            }))
        }

        async fn create_empty(&self, user_id: Uuid) -> Result<()> {
            self.conversations.lock().unwrap().entry(user_id).or_default();
            Ok(())
        }

        async fn append_turns(&self, user_id: Uuid, turns: &[Turn]) -> Result<()> {
            self.conversations
                .lock()
                .unwrap()
                .entry(user_id)
                .or_default()
                .extend_from_slice(turns);
            Ok(())
        }

        async fn clear(&self, user_id: Uuid) -> Result<()> {
            self.conversations.lock().unwrap().remove(&user_id);
            Ok(())
        }
    }

    enum Behaviour {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct FakeGenerator {
        behaviour: Behaviour,
        calls: AtomicUsize,
        last_payload: Mutex<Vec<GenerationMessage>>,
    }

    impl FakeGenerator {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                last_payload: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationClient for FakeGenerator {
        async fn generate(
            &self,
            _system_instruction: &str,
            messages: &[GenerationMessage],
        ) -> std::result::Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_payload.lock().unwrap() = messages.to_vec();
            match self.behaviour {
                Behaviour::Reply(text) => Ok(text.to_string()),
                Behaviour::Fail => Err(GenerationError::Malformed("bad json".to_string())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".to_string())
                }
            }
        }
    }

    fn service(store: Arc<MemoryStore>, generator: Arc<FakeGenerator>) -> ChatService {
        ChatService::new(store, generator, "be gentle", Duration::from_millis(200))
    }

    fn turn(speaker: &str, text: &str) -> Turn {
        Turn {
            speaker: speaker.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_message_creates_exchange() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let generator = FakeGenerator::new(Behaviour::Reply("I'm here with you."));
        let chat = service(store.clone(), generator.clone());

        let reply = chat.send_message(user_id, "hello").await.unwrap();
        assert_eq!(reply.response, "I'm here with you.");

        let turns = store.turns(user_id).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!((turns[0].speaker.as_str(), turns[0].text.as_str()), ("user", "hello"));
        assert_eq!(turns[1].speaker, "assistant");
        assert_eq!(turns[1].text, "I'm here with you.");
        assert_eq!(turns[1].created_at, reply.timestamp);
        assert!(turns[0].created_at <= turns[1].created_at);
    }

    #[tokio::test]
    async fn test_success_appends_exactly_two_turns() {
        let user_id = Uuid::new_v4();
        let store = MemoryStore::with_turns(
            user_id,
            vec![turn("user", "a"), turn("assistant", "b")],
        );
        let chat = service(store.clone(), FakeGenerator::new(Behaviour::Reply("d")));

        chat.send_message(user_id, "  c  ").await.unwrap();

        let turns = store.turns(user_id).unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].text, "c");
        assert_eq!(turns[2].speaker, "user");
        assert_eq!(turns[3].speaker, "assistant");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_side_effects() {
        let user_id = Uuid::new_v4();
        let before = vec![turn("user", "a"), turn("assistant", "b")];
        let store = MemoryStore::with_turns(user_id, before.clone());
        let generator = FakeGenerator::new(Behaviour::Reply("unused"));
        let chat = service(store.clone(), generator.clone());

        for message in ["", "   ", "\n\t"] {
            let err = chat.send_message(user_id, message).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert_eq!(store.turns(user_id).unwrap(), before);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_persists_nothing() {
        let user_id = Uuid::new_v4();
        let before = vec![turn("user", "a")];
        let store = MemoryStore::with_turns(user_id, before.clone());
        let chat = service(store.clone(), FakeGenerator::new(Behaviour::Fail));

        let err = chat.send_message(user_id, "c").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
        assert_eq!(store.turns(user_id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_generation_timeout_persists_nothing() {
        let user_id = Uuid::new_v4();
        let before = vec![turn("user", "a")];
        let store = MemoryStore::with_turns(user_id, before.clone());
        let generator = FakeGenerator::new(Behaviour::Hang);
        let chat = service(store.clone(), generator.clone());

        let err = chat.send_message(user_id, "c").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
        assert_eq!(store.turns(user_id).unwrap(), before);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_on_first_message_creates_no_record() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let chat = service(store.clone(), FakeGenerator::new(Behaviour::Fail));

        assert!(chat.send_message(user_id, "hello").await.is_err());
        assert!(store.turns(user_id).is_none());
    }

    #[tokio::test]
    async fn test_blank_reply_is_treated_as_failure() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let chat = service(store.clone(), FakeGenerator::new(Behaviour::Reply("   ")));

        let err = chat.send_message(user_id, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
        assert!(store.turns(user_id).is_none());
    }

    #[tokio::test]
    async fn test_payload_skips_blank_turns_and_maps_roles() {
        let user_id = Uuid::new_v4();
        let stored = vec![
            turn("user", "a"),
            turn("model", "b"),
            turn("user", "   "),
            turn("ai", "legacy"),
            turn("assistant", ""),
        ];
        let store = MemoryStore::with_turns(user_id, stored.clone());
        let generator = FakeGenerator::new(Behaviour::Reply("ok"));
        let chat = service(store.clone(), generator.clone());

        chat.send_message(user_id, "c").await.unwrap();

        let payload = generator.last_payload.lock().unwrap().clone();
        assert!(payload.iter().all(|m| !m.text.trim().is_empty()));
        let roles: Vec<_> = payload.iter().map(|m| (m.role, m.text.as_str())).collect();
        assert_eq!(
            roles,
            vec![
                (Role::User, "a"),
                (Role::Assistant, "b"),
                (Role::User, "legacy"),
                (Role::User, "c"),
            ]
        );

        // The stored history keeps its blank turns and raw speaker tags.
        let turns = store.turns(user_id).unwrap();
        assert_eq!(&turns[..stored.len()], &stored[..]);
    }

    #[test]
    fn test_build_payload_on_empty_history() {
        let inbound = turn("user", "hello");
        let payload = build_payload(&[], &inbound);
        assert_eq!(
            payload,
            vec![GenerationMessage { role: Role::User, text: "hello".to_string() }]
        );
    }

    #[test]
    fn test_build_payload_keeps_role_runs_left_by_blank_turns() {
        let history = vec![
            turn("assistant", "Welcome back."),
            turn("user", "a"),
            turn("assistant", "  "),
        ];
        let inbound = turn("user", "c");

        let payload = build_payload(&history, &inbound);

        assert_eq!(
            payload,
            vec![
                GenerationMessage { role: Role::Assistant, text: "Welcome back.".to_string() },
                GenerationMessage { role: Role::User, text: "a".to_string() },
                GenerationMessage { role: Role::User, text: "c".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_history_and_clear() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::default());
        let chat = service(store.clone(), FakeGenerator::new(Behaviour::Reply("ok")));

        assert!(chat.history(user_id).await.unwrap().is_empty());

        chat.start_conversation(user_id).await.unwrap();
        chat.send_message(user_id, "hi").await.unwrap();
        assert_eq!(chat.history(user_id).await.unwrap().len(), 2);

        chat.clear_history(user_id).await.unwrap();
        assert!(chat.history(user_id).await.unwrap().is_empty());
    }
}

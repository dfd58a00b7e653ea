//! Direct messages — typed passthrough over the `messages` table, with
//! client-side conversation folding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::TableClient;
use crate::error::BackendError;

const MESSAGES: &str = "messages";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One row per peer the user has exchanged messages with.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub peer_id: Uuid,
    pub last_message: Message,
    pub unread_count: u32,
}

/// Fold a newest-first message list into per-peer summaries. Unread counts
/// cover messages addressed to `user_id` that are still unread.
pub fn fold_conversations(user_id: Uuid, messages: Vec<Message>) -> Vec<ConversationSummary> {
    let mut summaries: Vec<ConversationSummary> = Vec::new();
    for message in messages {
        let peer_id = if message.sender_id == user_id {
            message.receiver_id
        } else {
            message.sender_id
        };
        let unread = u32::from(message.receiver_id == user_id && !message.read);

        match summaries.iter_mut().find(|s| s.peer_id == peer_id) {
            Some(summary) => summary.unread_count += unread,
            None => summaries.push(ConversationSummary {
                peer_id,
                last_message: message,
                unread_count: unread,
            }),
        }
    }
    summaries
}

pub struct MessageService {
    tables: TableClient,
}

impl MessageService {
    pub fn new(tables: TableClient) -> Self {
        Self { tables }
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Message, BackendError> {
        let body = serde_json::json!({
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "content": content,
            "read": false,
        });
        self.tables.insert(MESSAGES, &body).await
    }

    /// All messages between two users, oldest first.
    pub async fn thread(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, BackendError> {
        let filter = format!(
            "(and(sender_id.eq.{a},receiver_id.eq.{b}),and(sender_id.eq.{b},receiver_id.eq.{a}))"
        );
        self.tables
            .select(
                MESSAGES,
                &[("or", filter.as_str()), ("order", "created_at.asc")],
            )
            .await
    }

    /// Per-peer conversation summaries for a user, newest conversations
    /// first.
    pub async fn conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, BackendError> {
        let filter = format!("(sender_id.eq.{user_id},receiver_id.eq.{user_id})");
        let messages: Vec<Message> = self
            .tables
            .select(
                MESSAGES,
                &[("or", filter.as_str()), ("order", "created_at.desc")],
            )
            .await?;
        Ok(fold_conversations(user_id, messages))
    }

    /// Mark everything a peer sent to this user as read. Returns the number
    /// of messages updated.
    pub async fn mark_read(&self, user_id: Uuid, peer_id: Uuid) -> Result<usize, BackendError> {
        let receiver = format!("eq.{user_id}");
        let sender = format!("eq.{peer_id}");
        let rows: Vec<Message> = self
            .tables
            .update(
                MESSAGES,
                &[
                    ("receiver_id", receiver.as_str()),
                    ("sender_id", sender.as_str()),
                ],
                &serde_json::json!({ "read": true }),
            )
            .await?;
        Ok(rows.len())
    }
}

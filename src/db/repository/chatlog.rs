//! Local conversation log for the AI assistant.
//!
//! The chat API is stateless single-turn; the transcript — including raw
//! provider error strings on the degraded path — is kept on the device only.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;

/// Who produced a chat log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    User,
    Assistant,
    /// Raw provider error text surfaced in the transcript instead of a reply.
    Error,
}

impl MessageSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for MessageSender {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "error" => Ok(Self::Error),
            _ => Err(DatabaseError::InvalidEnum {
                field: "MessageSender".into(),
                value: s.into(),
            }),
        }
    }
}

/// One entry of a local conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: String,
    pub sender: MessageSender,
    pub body: String,
    pub created_at: String,
}

/// Conversation row for the sidebar list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub started_at: String,
    pub message_count: u32,
}

/// Create a conversation and return its id.
pub fn create_conversation(conn: &Connection, title: &str) -> Result<String, DatabaseError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO conversations (id, title) VALUES (?1, ?2)",
        params![id, title],
    )?;
    Ok(id)
}

/// Append a message to a conversation.
pub fn append_message(
    conn: &Connection,
    conversation_id: &str,
    sender: MessageSender,
    body: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (conversation_id, sender, body) VALUES (?1, ?2, ?3)",
        params![conversation_id, sender.as_str(), body],
    )?;
    Ok(())
}

/// All messages of a conversation, oldest first.
pub fn list_messages(
    conn: &Connection,
    conversation_id: &str,
) -> Result<Vec<ChatMessage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender, body, created_at
         FROM messages WHERE conversation_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([conversation_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, conversation_id, sender, body, created_at) = row?;
        messages.push(ChatMessage {
            id,
            conversation_id,
            sender: sender.parse()?,
            body,
            created_at,
        });
    }
    Ok(messages)
}

/// Conversation list with message counts, most recent first.
pub fn list_conversations(conn: &Connection) -> Result<Vec<ConversationSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.title, c.started_at, COUNT(m.id)
         FROM conversations c
         LEFT JOIN messages m ON m.conversation_id = c.id
         GROUP BY c.id
         ORDER BY c.started_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ConversationSummary {
            id: row.get(0)?,
            title: row.get(1)?,
            started_at: row.get(2)?,
            message_count: row.get::<_, i64>(3)? as u32,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Delete a conversation and (via cascade) its messages.
pub fn delete_conversation(conn: &Connection, conversation_id: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM conversations WHERE id = ?1",
        [conversation_id],
    )?;
    Ok(())
}

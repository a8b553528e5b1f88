//! Assistant chat endpoints, backed by the local conversation log.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::api::endpoints::require_uid;
use crate::api::error::ApiError;
use crate::api::types::{ChatRequest, ChatResponse};
use crate::assistant::send_logged_message;
use crate::core_state::CoreState;
use crate::db::repository::chatlog::{
    create_conversation, list_conversations, list_messages, ChatMessage, ConversationSummary,
};

/// Send one message. Opens a new conversation when no id is given; provider
/// failures come back as the reply text, logged as an error entry.
pub async fn send(
    State(core): State<Arc<CoreState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    require_uid(&core)?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message is empty".into()));
    }

    let mut conn = core.open_db()?;
    let conversation_id = match body.conversation_id {
        Some(id) => id,
        None => {
            // First user line doubles as the conversation title.
            let title: String = message.chars().take(60).collect();
            create_conversation(&conn, &title)?
        }
    };

    let api_key = core.load_settings()?.gemini_api_key;
    let reply = send_logged_message(
        &core.assistant,
        &mut conn,
        &conversation_id,
        message,
        api_key.as_deref(),
    )
    .await?;

    Ok(Json(ChatResponse {
        conversation_id,
        reply,
    }))
}

/// All conversations, most recent first.
pub async fn conversations(
    State(core): State<Arc<CoreState>>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    require_uid(&core)?;
    let conn = core.open_db()?;
    Ok(Json(list_conversations(&conn)?))
}

/// Full transcript of one conversation.
pub async fn transcript(
    State(core): State<Arc<CoreState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    require_uid(&core)?;
    let conn = core.open_db()?;
    let messages = list_messages(&conn, &conversation_id)?;
    Ok(Json(messages))
}

//! AI assistant — stateless single-turn chat completion over HTTP.
//!
//! One request per message, no conversation state on the provider side. The
//! transcript lives in the local chat log; when the provider fails, the raw
//! error string is appended to the transcript instead of retrying.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository::chatlog::{append_message, MessageSender};
use crate::db::DatabaseError;

/// Default Gemini endpoint and model.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-2xx from the provider; carries the raw provider message.
    #[error("{0}")]
    Provider(String),
    #[error("Empty completion in provider response")]
    EmptyResponse,
}

/// HTTP client for the chat completion API.
pub struct AssistantClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Production endpoint with the default model.
    pub fn default_remote() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single-turn completion: prompt in, response text out.
    pub async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, AssistantError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(raw));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|text| !text.is_empty())
            .ok_or(AssistantError::EmptyResponse)
    }
}

/// Send one message within a logged conversation.
///
/// The user's prompt is always appended first. On success the reply is
/// appended as an assistant entry; on failure the raw error string lands in
/// the transcript as an error entry — the degraded path, no retry.
pub async fn send_logged_message(
    client: &AssistantClient,
    conn: &mut Connection,
    conversation_id: &str,
    prompt: &str,
    api_key: Option<&str>,
) -> Result<String, DatabaseError> {
    append_message(conn, conversation_id, MessageSender::User, prompt)?;

    let result = match api_key {
        Some(key) => client.complete(prompt, key).await,
        None => Err(AssistantError::MissingApiKey),
    };
    match result {
        Ok(reply) => {
            append_message(conn, conversation_id, MessageSender::Assistant, &reply)?;
            Ok(reply)
        }
        Err(e) => {
            let raw = e.to_string();
            tracing::warn!(conversation = conversation_id, "Chat completion failed: {raw}");
            append_message(conn, conversation_id, MessageSender::Error, &raw)?;
            Ok(raw)
        }
    }
}

// ── Wire types (Gemini generateContent) ─────────────────────

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

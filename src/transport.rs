// Messaging transport: the three chat API calls the scoreboard needs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, ScoreError};

pub type ChannelId = u64;
pub type MessageId = u64;

/// Where a posted message lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Post a new message and return where it landed.
    async fn send(&self, channel_id: ChannelId, body: &str) -> Result<MessageRef>;

    /// Current body of a message. Fails with NotFound or Forbidden when the
    /// message or its channel cannot be reached.
    async fn fetch(&self, message: &MessageRef) -> Result<String>;

    /// Replace the body of a message.
    async fn edit(&self, message: &MessageRef, body: &str) -> Result<()>;
}

// ── Discord REST ──────────────────────────────────────────────────────

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Talks to the Discord REST API with a bot token.
pub struct DiscordTransport {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Deserialize)]
struct DiscordMessage {
    id: String,
    #[serde(default)]
    content: String,
}

impl DiscordTransport {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn messages_url(&self, channel_id: ChannelId) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_base)
    }

    fn message_url(&self, message: &MessageRef) -> String {
        format!(
            "{}/{}",
            self.messages_url(message.channel_id),
            message.message_id
        )
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<DiscordMessage> {
        let response = request
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| ScoreError::TransientTransport(format!("Chat API unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(%status, %detail, "Chat API request failed");
            return Err(status_error(status));
        }

        response
            .json::<DiscordMessage>()
            .await
            .map_err(|e| ScoreError::TransientTransport(format!("Malformed chat API response: {e}")))
    }
}

/// Map a failed chat API status onto an error kind.
fn status_error(status: StatusCode) -> ScoreError {
    match status {
        StatusCode::NOT_FOUND => {
            ScoreError::not_found("message", "The message or its channel no longer exists.")
        }
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            ScoreError::Forbidden("Missing access to the message or its channel.".to_string())
        }
        other => ScoreError::TransientTransport(format!("Chat API returned {other}")),
    }
}

#[async_trait]
impl MessageTransport for DiscordTransport {
    async fn send(&self, channel_id: ChannelId, body: &str) -> Result<MessageRef> {
        let message = self
            .execute(
                self.client
                    .post(self.messages_url(channel_id))
                    .json(&json!({ "content": body })),
            )
            .await?;
        let message_id = message.id.parse().map_err(|_| {
            ScoreError::TransientTransport(format!("Invalid message id '{}'", message.id))
        })?;
        Ok(MessageRef {
            channel_id,
            message_id,
        })
    }

    async fn fetch(&self, message: &MessageRef) -> Result<String> {
        let fetched = self
            .execute(self.client.get(self.message_url(message)))
            .await?;
        Ok(fetched.content)
    }

    async fn edit(&self, message: &MessageRef, body: &str) -> Result<()> {
        self.execute(
            self.client
                .patch(self.message_url(message))
                .json(&json!({ "content": body })),
        )
        .await?;
        Ok(())
    }
}

// ── In-memory ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    next_id: MessageId,
    messages: HashMap<MessageRef, String>,
    forbidden: HashSet<ChannelId>,
}

/// Keeps messages in process memory. Used when no chat token is configured
/// and by tests, which can delete messages or lock channels to simulate
/// external changes.
#[derive(Default)]
pub struct MemoryTransport {
    inner: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body of a message, if it still exists.
    pub fn body(&self, message: &MessageRef) -> Option<String> {
        let state = self.inner.lock().unwrap();
        state.messages.get(message).cloned()
    }

    /// Bodies of every message in a channel, oldest first.
    pub fn channel_messages(&self, channel_id: ChannelId) -> Vec<String> {
        let state = self.inner.lock().unwrap();
        let mut found: Vec<(&MessageRef, &String)> = state
            .messages
            .iter()
            .filter(|(r, _)| r.channel_id == channel_id)
            .collect();
        found.sort_by_key(|(r, _)| r.message_id);
        found.into_iter().map(|(_, body)| body.clone()).collect()
    }

    pub fn delete_message(&self, message: &MessageRef) -> bool {
        let mut state = self.inner.lock().unwrap();
        state.messages.remove(message).is_some()
    }

    /// Deny access to a channel from now on.
    pub fn forbid_channel(&self, channel_id: ChannelId) {
        let mut state = self.inner.lock().unwrap();
        state.forbidden.insert(channel_id);
    }
}

fn check_access(state: &MemoryState, channel_id: ChannelId) -> Result<()> {
    if state.forbidden.contains(&channel_id) {
        return Err(ScoreError::Forbidden(format!(
            "Missing access to channel {channel_id}."
        )));
    }
    Ok(())
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send(&self, channel_id: ChannelId, body: &str) -> Result<MessageRef> {
        let mut state = self.inner.lock().unwrap();
        check_access(&state, channel_id)?;
        state.next_id += 1;
        let message = MessageRef {
            channel_id,
            message_id: state.next_id,
        };
        state.messages.insert(message, body.to_string());
        Ok(message)
    }

    async fn fetch(&self, message: &MessageRef) -> Result<String> {
        let state = self.inner.lock().unwrap();
        check_access(&state, message.channel_id)?;
        state.messages.get(message).cloned().ok_or_else(|| {
            ScoreError::not_found(
                "message",
                format!("Message {} no longer exists.", message.message_id),
            )
        })
    }

    async fn edit(&self, message: &MessageRef, body: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        check_access(&state, message.channel_id)?;
        match state.messages.get_mut(message) {
            Some(existing) => {
                *existing = body.to_string();
                Ok(())
            }
            None => Err(ScoreError::not_found(
                "message",
                format!("Message {} no longer exists.", message.message_id),
            )),
        }
    }
}

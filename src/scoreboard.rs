// Scoreboard renderer: one posted message whose body grows a line per score.
//
// The appended lines are text only. They are not derived from the duel
// ledger and recording a score here does not create a duel; callers that
// want both must do both.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::Database;
use crate::error::{Result, ScoreError};
use crate::metrics;
use crate::transport::{ChannelId, MessageRef, MessageTransport};

/// Body of a freshly spawned scoreboard.
pub const DEFAULT_BODY: &str = "**Scoreboard**\nA new scoreboard has been spawned!";

/// Longest body the chat API accepts for one message.
pub const MAX_BODY_CHARS: usize = 2000;

/// One scoreboard line, e.g. `Alpha: 3 - 5 :Beta`.
pub fn format_line(
    attacker: &str,
    attacking_score: i64,
    defending_score: i64,
    defender: &str,
) -> String {
    format!("{attacker}: {attacking_score} - {defending_score} :{defender}")
}

pub struct ScoreboardRenderer {
    db: Arc<Database>,
    transport: Arc<dyn MessageTransport>,
    /// Serializes fetch-then-edit per scoreboard message.
    locks: Mutex<HashMap<MessageRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScoreboardRenderer {
    pub fn new(db: Arc<Database>, transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            db,
            transport,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The remembered scoreboard message, if one was ever set up.
    pub async fn current(&self) -> Result<Option<MessageRef>> {
        let row = self.db.get_scoreboard().await?;
        Ok(row.map(|r| MessageRef {
            channel_id: r.channel_id as ChannelId,
            message_id: r.message_id as u64,
        }))
    }

    /// Post a new scoreboard in `channel_id` and remember it, replacing any
    /// previous reference.
    pub async fn setup(&self, channel_id: ChannelId) -> Result<MessageRef> {
        let message = self.transport.send(channel_id, DEFAULT_BODY).await?;
        self.db
            .set_scoreboard(message.channel_id as i64, message.message_id as i64)
            .await?;
        self.locks.lock().unwrap().retain(|m, _| *m == message);
        tracing::info!(
            channel_id = message.channel_id,
            message_id = message.message_id,
            "Scoreboard spawned"
        );
        Ok(message)
    }

    /// Append a score line to the remembered scoreboard and return the line.
    ///
    /// When the message can no longer be reached the error is returned and
    /// the stored reference is left as is; a new setup is needed.
    pub async fn add_score(
        &self,
        attacker: &str,
        attacking_score: i64,
        defender: &str,
        defending_score: i64,
    ) -> Result<String> {
        let attacker = attacker.trim();
        let defender = defender.trim();
        if attacker.is_empty() {
            return Err(ScoreError::invalid("attacking_gang", "Gang name cannot be empty."));
        }
        if defender.is_empty() {
            return Err(ScoreError::invalid("defending_gang", "Gang name cannot be empty."));
        }
        if attacking_score < 0 || defending_score < 0 {
            let field = if attacking_score < 0 {
                "attacking_score"
            } else {
                "defending_score"
            };
            return Err(ScoreError::invalid(field, "Scores cannot be negative."));
        }

        let message = self.current().await?.ok_or_else(|| {
            ScoreError::not_found(
                "scoreboard",
                "No scoreboard has been set up. Use /scoreboard spawn to set up the scoreboard first.",
            )
        })?;

        let line = format_line(attacker, attacking_score, defending_score, defender);

        let lock = self.lock_for(&message);
        let _guard = lock.lock().await;

        let body = self
            .transport
            .fetch(&message)
            .await
            .inspect_err(|e| Self::record_failure(&message, e))?;

        let new_body = if body.is_empty() {
            line.clone()
        } else {
            format!("{body}\n{line}")
        };
        if new_body.chars().count() > MAX_BODY_CHARS {
            return Err(ScoreError::invalid(
                "scoreboard",
                "The scoreboard is full. Spawn a new scoreboard to keep adding scores.",
            ));
        }

        self.transport
            .edit(&message, &new_body)
            .await
            .inspect_err(|e| Self::record_failure(&message, e))?;

        metrics::SCOREBOARD_LINES_TOTAL.inc();
        tracing::debug!(message_id = message.message_id, %line, "Scoreboard line appended");
        Ok(line)
    }

    fn lock_for(&self, message: &MessageRef) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(*message).or_default().clone()
    }

    fn record_failure(message: &MessageRef, e: &ScoreError) {
        metrics::SCOREBOARD_FAILURES_TOTAL
            .with_label_values(&[e.kind().as_str()])
            .inc();
        tracing::warn!(
            channel_id = message.channel_id,
            message_id = message.message_id,
            error = %e,
            "Scoreboard message unavailable"
        );
    }
}

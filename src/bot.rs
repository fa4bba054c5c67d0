// The bot's services, wired around one store handle and one transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::db::Database;
use crate::ledger::DuelLedger;
use crate::registry::GangRegistry;
use crate::scoreboard::ScoreboardRenderer;
use crate::transport::MessageTransport;

pub struct Bot {
    pub db: Arc<Database>,
    pub gangs: GangRegistry,
    pub wars: DuelLedger,
    pub scoreboard: ScoreboardRenderer,
    pub transport: Arc<dyn MessageTransport>,
    pub settings: Settings,
    pub started_at: DateTime<Utc>,
}

impl Bot {
    pub fn new(
        db: Arc<Database>,
        transport: Arc<dyn MessageTransport>,
        settings: Settings,
    ) -> Self {
        Self {
            gangs: GangRegistry::new(db.clone(), settings.gangs.clone()),
            wars: DuelLedger::new(db.clone()),
            scoreboard: ScoreboardRenderer::new(db.clone(), transport.clone()),
            db,
            transport,
            settings,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Log a summary of what the bot starts with.
    pub async fn log_ready(&self, modules: &[&str]) {
        let gangs = self.gangs.get_all().await.map(|g| g.len());
        let wars = self.wars.get_all().await.map(|d| d.len());
        match (gangs, wars) {
            (Ok(gangs), Ok(wars)) => tracing::info!(gangs, wars, "Record store ready"),
            (Err(e), _) | (_, Err(e)) => tracing::error!("Record store unavailable: {e}"),
        }
        match self.scoreboard.current().await {
            Ok(Some(message)) => tracing::info!(
                channel_id = message.channel_id,
                message_id = message.message_id,
                "Scoreboard remembered"
            ),
            Ok(None) => tracing::info!("No scoreboard set up yet"),
            Err(e) => tracing::error!("Could not read scoreboard reference: {e}"),
        }
        tracing::info!(?modules, "Active command modules");
        tracing::debug!(settings = ?self.settings, "Settings");
        tracing::info!("Bot is ready.");
    }
}

// Command modules and the dispatcher that routes invocations to them.
//
// Modules are registered statically; which ones answer is decided once at
// startup from the settings file.

pub mod devtools;
pub mod gangs;
pub mod scoreboard;
pub mod wars;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bot::Bot;
use crate::config::Settings;
use crate::error::{Result, ScoreError};
use crate::metrics;

/// A parsed slash command: `/{module} {command}` plus its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub module: String,
    #[serde(default)]
    pub command: String,
    /// Channel the command was issued in.
    #[serde(default)]
    pub channel_id: Option<u64>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Text sent back to whoever issued the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    /// Only visible to the issuer.
    pub ephemeral: bool,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }
}

impl Invocation {
    pub fn new(module: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            command: command.into(),
            channel_id: None,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn in_channel(mut self, channel_id: u64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    fn missing(key: &'static str) -> ScoreError {
        ScoreError::invalid(key, format!("Missing option `{key}`."))
    }

    pub(crate) fn str_option(&self, key: &'static str) -> Result<&str> {
        match self.options.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ScoreError::invalid(key, format!("Option `{key}` must be text."))),
            None => Err(Self::missing(key)),
        }
    }

    /// Integer option. Numeric strings are accepted too.
    pub(crate) fn int_option(&self, key: &'static str) -> Result<i64> {
        self.opt_int_option(key)?.ok_or_else(|| Self::missing(key))
    }

    pub(crate) fn opt_int_option(&self, key: &'static str) -> Result<Option<i64>> {
        let not_integer = || ScoreError::invalid(key, format!("Option `{key}` must be a whole number."));
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(not_integer),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| not_integer()),
            Some(_) => Err(not_integer()),
        }
    }

    /// Channel option (snowflake, usually sent as a string), falling back to
    /// the channel the command was issued in.
    pub(crate) fn channel_option(&self, key: &'static str) -> Result<u64> {
        let invalid = || ScoreError::invalid(key, format!("Option `{key}` must be a channel."));
        match self.options.get(key) {
            Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid),
            Some(_) => Err(invalid()),
            None => self.channel_id.ok_or_else(|| Self::missing(key)),
        }
    }
}

/// Every command module the bot knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Gangs,
    Wars,
    Scoreboard,
    Database,
    Ping,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 5] = [
        ModuleKind::Gangs,
        ModuleKind::Wars,
        ModuleKind::Scoreboard,
        ModuleKind::Database,
        ModuleKind::Ping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Gangs => "gangs",
            ModuleKind::Wars => "wars",
            ModuleKind::Scoreboard => "scoreboard",
            ModuleKind::Database => "database",
            ModuleKind::Ping => "ping",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Subcommands the module answers to. `ping` is a bare command.
    pub fn commands(self) -> &'static [&'static str] {
        match self {
            ModuleKind::Gangs => &["create", "delete", "edit", "list"],
            ModuleKind::Wars => &["create", "delete", "edit", "recent", "gang"],
            ModuleKind::Scoreboard => &["spawn", "add"],
            ModuleKind::Database => &["flush", "fake_data"],
            ModuleKind::Ping => &[""],
        }
    }
}

pub(crate) fn unknown_command(inv: &Invocation) -> ScoreError {
    let name = if inv.command.is_empty() {
        format!("/{}", inv.module)
    } else {
        format!("/{} {}", inv.module, inv.command)
    };
    ScoreError::not_found("command", format!("Unknown command `{name}`."))
}

/// The modules enabled for this process.
#[derive(Debug, Clone)]
pub struct CommandTable {
    modules: Vec<ModuleKind>,
    log_invocations: bool,
}

impl CommandTable {
    pub fn new(modules: Vec<ModuleKind>) -> Self {
        Self {
            modules,
            log_invocations: false,
        }
    }

    /// Enable the configured modules. Unknown names are logged and skipped.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut modules = Vec::new();
        for name in settings.enabled_modules() {
            match ModuleKind::from_name(&name) {
                Some(module) => {
                    tracing::debug!(module = %name, "Enabled command module");
                    modules.push(module);
                }
                None => tracing::error!(module = %name, "Unknown command module in settings"),
            }
        }
        tracing::info!("Enabled {} command modules", modules.len());
        Self {
            modules,
            log_invocations: settings.debug.enabled && settings.debug.debug_commands,
        }
    }

    pub fn modules(&self) -> &[ModuleKind] {
        &self.modules
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn is_enabled(&self, module: ModuleKind) -> bool {
        self.modules.contains(&module)
    }

    /// Run one invocation and turn its outcome into a reply. Failures
    /// become ephemeral replies carrying the error message.
    pub async fn dispatch(&self, bot: &Bot, inv: &Invocation) -> Reply {
        if self.log_invocations {
            tracing::info!(module = %inv.module, command = %inv.command, options = ?inv.options, "Command invoked");
        }

        let module = match ModuleKind::from_name(&inv.module) {
            Some(m) if self.is_enabled(m) => m,
            _ => return Reply::ephemeral(unknown_command(inv).to_string()),
        };

        let result = match module {
            ModuleKind::Gangs => gangs::handle(bot, inv).await,
            ModuleKind::Wars => wars::handle(bot, inv).await,
            ModuleKind::Scoreboard => scoreboard::handle(bot, inv).await,
            ModuleKind::Database => devtools::handle_database(bot, inv).await,
            ModuleKind::Ping => devtools::handle_ping(bot, inv).await,
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        metrics::COMMANDS_TOTAL
            .with_label_values(&[module.name(), inv.command.as_str(), outcome])
            .inc();

        match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(module = module.name(), command = %inv.command, error = %e, "Command failed");
                Reply::ephemeral(e.to_string())
            }
        }
    }
}

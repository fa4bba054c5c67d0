// Application configuration, loaded from environment variables, CLI flags
// and a JSON settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::DEFAULT_DISCORD_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Listen address used when none is configured.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Address the HTTP server listens on.
    pub bind_address: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bot token for the chat API. `None` runs the bot offline.
    pub discord_token: Option<String>,
    /// Base URL of the chat REST API.
    pub discord_api_base: String,
    /// Where the settings were read from.
    pub settings_path: PathBuf,
    pub settings: Settings,
}

/// Contents of the JSON settings file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Command modules enabled at startup.
    #[serde(alias = "default_cogs")]
    pub default_modules: Vec<String>,
    pub debug: DebugSettings,
    pub gangs: GangSettings,
    pub war: WarSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub enabled: bool,
    /// Log every dispatched command with its options.
    pub debug_commands: bool,
    /// Extra modules enabled only in debug mode.
    #[serde(alias = "debug_cogs")]
    pub debug_modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GangSettings {
    pub name_length_limit: usize,
    pub max_gangs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarSettings {
    /// Announce every new war in `update_channel_id`.
    pub updates: bool,
    pub update_channel_id: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_modules: vec!["gangs".into(), "wars".into(), "scoreboard".into()],
            debug: DebugSettings::default(),
            gangs: GangSettings::default(),
            war: WarSettings::default(),
        }
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            debug_commands: false,
            debug_modules: vec!["ping".into(), "database".into()],
        }
    }
}

impl Default for GangSettings {
    fn default() -> Self {
        Self {
            name_length_limit: 20,
            max_gangs: 100,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read settings from a file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Settings file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Modules to enable: the defaults, plus the debug set when debug is on.
    pub fn enabled_modules(&self) -> Vec<String> {
        let mut modules = self.default_modules.clone();
        if self.debug.enabled {
            for module in &self.debug.debug_modules {
                if !modules.contains(module) {
                    modules.push(module.clone());
                }
            }
        }
        modules
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:scorekeeper.db?mode=rwc`)
    /// - `BIND_ADDRESS` - HTTP listen address (default: `127.0.0.1`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `SCOREKEEPER_CONFIG` - Path to the JSON settings file (default: `config.json`)
    /// - `DISCORD_TOKEN` - Bot token; without it the bot runs offline
    /// - `DISCORD_API_BASE` - Chat REST API base URL
    ///
    /// CLI flags:
    /// - `--bind <ADDR>` - Override the listen address
    /// - `--port <PORT>` - Override the port
    /// - `--config <PATH>` - Override the settings file
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:scorekeeper.db?mode=rwc".to_string());

        let bind_address = Self::resolve_bind_address(
            Self::parse_cli_value(&args, "--bind"),
            std::env::var("BIND_ADDRESS").ok(),
        );

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let settings_path = Self::parse_cli_value(&args, "--config")
            .or_else(|| std::env::var("SCOREKEEPER_CONFIG").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.json"));

        let discord_token = std::env::var("DISCORD_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let discord_api_base = std::env::var("DISCORD_API_BASE")
            .unwrap_or_else(|_| DEFAULT_DISCORD_API_BASE.to_string());

        let settings = Settings::load_from_file(&settings_path)?;

        Ok(Config {
            database_url,
            bind_address,
            port,
            discord_token,
            discord_api_base,
            settings_path,
            settings,
        })
    }

    /// The HTTP API is unauthenticated, so it stays on loopback unless an
    /// address is given explicitly.
    fn resolve_bind_address(cli: Option<String>, env: Option<String>) -> String {
        cli.or(env)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("config.json")
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = Settings::from_json("{}", &path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.gangs.name_length_limit, 20);
        assert_eq!(settings.gangs.max_gangs, 100);
        assert!(!settings.war.updates);
    }

    #[test]
    fn test_legacy_cog_keys() {
        let json = r#"{
            "default_cogs": ["gangs", "wars"],
            "debug": { "enabled": true, "debug_cogs": ["ping"] },
            "gangs": { "name_length_limit": 12 },
            "war": { "updates": true, "update_channel_id": 555 }
        }"#;
        let settings = Settings::from_json(json, &path()).unwrap();
        assert_eq!(settings.default_modules, vec!["gangs", "wars"]);
        assert_eq!(settings.debug.debug_modules, vec!["ping"]);
        assert_eq!(settings.gangs.name_length_limit, 12);
        assert_eq!(settings.gangs.max_gangs, 100);
        assert_eq!(settings.war.update_channel_id, 555);
        assert_eq!(settings.enabled_modules(), vec!["gangs", "wars", "ping"]);
    }

    #[test]
    fn test_debug_modules_only_when_enabled() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.enabled_modules(),
            vec!["gangs", "wars", "scoreboard"]
        );
        settings.debug.enabled = true;
        settings.debug.debug_modules.push("gangs".into());
        assert_eq!(
            settings.enabled_modules(),
            vec!["gangs", "wars", "scoreboard", "ping", "database"]
        );
    }

    #[test]
    fn test_malformed_settings() {
        let err = Settings::from_json("{ not json", &path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_defaults() {
        let missing = std::env::temp_dir().join("scorekeeper-does-not-exist.json");
        let settings = Settings::load_from_file(&missing).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let example = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.json");
        let settings = Settings::load_from_file(&example).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_bind_address_defaults_to_loopback() {
        assert_eq!(Config::resolve_bind_address(None, None), "127.0.0.1");
        assert_eq!(Config::resolve_bind_address(None, Some(" ".into())), "127.0.0.1");
        assert_eq!(
            Config::resolve_bind_address(None, Some("0.0.0.0".into())),
            "0.0.0.0"
        );
        assert_eq!(
            Config::resolve_bind_address(Some("10.0.0.5".into()), Some("0.0.0.0".into())),
            "10.0.0.5"
        );
    }

    #[test]
    fn test_parse_cli_value() {
        let args: Vec<String> = ["bin", "--port", "8080", "--config", "x.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(Config::parse_cli_value(&args, "--port").as_deref(), Some("8080"));
        assert_eq!(Config::parse_cli_value(&args, "--config").as_deref(), Some("x.json"));
        assert_eq!(Config::parse_cli_value(&args, "--missing"), None);
    }
}

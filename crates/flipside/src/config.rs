//! Server configuration and the optional JSON config file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use flipside_authority::{GameConfig, GameRecord, InMemoryRegistry};
use flipside_protocol::PlayerId;
use flipside_session::TokenTable;
use serde::{Deserialize, Serialize};

use crate::FlipsideError;

/// Settings for a [`FlipsideServer`](crate::FlipsideServer).
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,
    /// How long a fresh connection may take to send `Identify`.
    pub identify_timeout_secs: u64,
    /// How long a connection may stay silent before it is dropped.
    pub idle_timeout_secs: u64,
    /// Command queue capacity of each game actor.
    pub game_channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            identify_timeout_secs: 5,
            idle_timeout_secs: 300,
            game_channel_size: GameConfig::default().channel_size,
        }
    }
}

impl ServerConfig {
    pub fn identify_timeout(&self) -> Duration {
        Duration::from_secs(self.identify_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            channel_size: self.game_channel_size,
        }
    }
}

/// What the `flipside-server` binary reads from its config file:
/// server settings plus seed data for the bundled token table and
/// in-memory registry.
///
/// ```json
/// {
///   "bind": "0.0.0.0:9000",
///   "tokens": { "alpha": 1, "beta": 2 },
///   "games": [{ "id": "5b7c...", "host": 1, "guest": 2 }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tokens: HashMap<String, PlayerId>,
    #[serde(default)]
    pub games: Vec<GameRecord>,
}

impl FileConfig {
    /// Reads and parses the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlipsideError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| {
            FlipsideError::ConfigIo {
                path: display.clone(),
                source,
            }
        })?;
        Self::parse(&text).map_err(|source| FlipsideError::ConfigParse {
            path: display,
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Replaces the bind address when `bind` is set and non-empty.
    pub fn override_bind(&mut self, bind: Option<String>) {
        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            tracing::debug!(%bind, "bind address overridden");
            self.server.bind = bind;
        }
    }

    pub fn token_table(&self) -> TokenTable {
        self.tokens
            .iter()
            .map(|(token, player)| (token.clone(), *player))
            .collect()
    }

    pub fn registry(&self) -> InMemoryRegistry {
        self.games.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use flipside_protocol::GameId;

    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.identify_timeout(), Duration::from_secs(5));
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.game_config(), GameConfig::default());
    }

    #[test]
    fn test_parse_empty_object_uses_defaults() {
        let config = FileConfig::parse("{}").unwrap();

        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_parse_reads_server_keys_and_seed_data() {
        let id = GameId::new_v4();
        let text = format!(
            r#"{{
                "bind": "0.0.0.0:9000",
                "identify_timeout_secs": 2,
                "tokens": {{ "alpha": 1, "beta": 2 }},
                "games": [{{ "id": "{}", "host": 1, "guest": 2 }}]
            }}"#,
            id.0
        );

        let config = FileConfig::parse(&text).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.identify_timeout_secs, 2);
        assert_eq!(config.server.idle_timeout_secs, 300);
        assert_eq!(config.tokens["beta"], PlayerId(2));
        assert_eq!(config.token_table().len(), 2);
        let record = config.registry().get(id).expect("seeded game");
        assert_eq!(record.host, PlayerId(1));
        assert!(!record.finished);
    }

    #[test]
    fn test_override_bind_ignores_blank() {
        let mut config = FileConfig::default();

        config.override_bind(Some("  ".into()));
        assert_eq!(config.server.bind, ServerConfig::default().bind);

        config.override_bind(Some("0.0.0.0:1".into()));
        assert_eq!(config.server.bind, "0.0.0.0:1");
    }

    #[test]
    fn test_load_missing_file_is_config_io() {
        let err = FileConfig::load("/definitely/not/here.json").unwrap_err();

        assert!(matches!(err, FlipsideError::ConfigIo { .. }));
    }

    #[test]
    fn test_load_invalid_json_is_config_parse() {
        let path = std::env::temp_dir()
            .join(format!("flipside-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, FlipsideError::ConfigParse { .. }));
    }
}

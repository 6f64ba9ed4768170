//! Game actor configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every game actor an [`Authority`](crate::Authority)
/// spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Capacity of each game's command channel. When it is full, callers
    /// wait (backpressure) rather than the actor buffering without bound.
    pub channel_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { channel_size: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        assert_eq!(GameConfig::default().channel_size, 64);
    }

    #[test]
    fn test_game_config_missing_fields_use_defaults() {
        let config: GameConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GameConfig::default());
    }
}

//! Configuration for a Memory Device host.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! [dialogue]
//! reveal_interval_ms = 30
//!
//! [storage]
//! fragments_key = "memory_device_fragments_v1"
//!
//! [flags]
//! wood_collected = 0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::flags::{FlagSchema, FlagValue};

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Dialogue timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Milliseconds per revealed character.
    pub reveal_interval_ms: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            reveal_interval_ms: 30,
        }
    }
}

/// Toast notification timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// How long a toast stays visible.
    pub duration_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self { duration_ms: 3000 }
    }
}

/// Storage keys for persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub fragments_key: String,
    pub completion_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fragments_key: "memory_device_fragments_v1".to_string(),
            completion_key: "memory_device_completed".to_string(),
        }
    }
}

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RNG seed for random lines and the mushroom roll.
    pub seed: u64,
    /// Player and companion walking speed, world units per second.
    pub walk_speed: f32,
    /// Delay before the opening monologue.
    pub intro_delay_ms: u64,
    /// Length of the boot screen before the title menu.
    pub boot_duration_ms: u64,
    /// Chance that an eaten mushroom is poisonous.
    pub poison_chance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            walk_speed: 70.0,
            intro_delay_ms: 1000,
            boot_duration_ms: 3800,
            poison_chance: 0.7,
        }
    }
}

/// Complete host configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub dialogue: DialogueConfig,
    pub toast: ToastConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    /// Default overrides for declared story flags.
    pub flags: BTreeMap<String, FlagValue>,
}

impl StoryConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StoryConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.session.seed = seed;
        self
    }

    /// Set the per-character reveal interval.
    pub fn with_reveal_interval(mut self, ms: u64) -> Self {
        self.dialogue.reveal_interval_ms = ms;
        self
    }

    /// Set the mushroom poison chance.
    pub fn with_poison_chance(mut self, chance: f64) -> Self {
        self.session.poison_chance = chance;
        self
    }

    /// The story flag schema with this config's default overrides applied.
    pub fn flag_schema(&self) -> FlagSchema {
        let mut schema = FlagSchema::story();
        for (name, value) in &self.flags {
            if let Some(decl) = schema.get(name) {
                let description = decl.description.clone();
                schema = schema.declare(name.clone(), *value, description);
            }
        }
        schema
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dialogue.reveal_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "dialogue.reveal_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.session.poison_chance) {
            return Err(ConfigError::Invalid {
                field: "session.poison_chance".to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }
        let schema = FlagSchema::story();
        for (name, value) in &self.flags {
            let Some(decl) = schema.get(name) else {
                return Err(ConfigError::Invalid {
                    field: format!("flags.{}", name),
                    reason: "not a declared story flag".to_string(),
                });
            };
            if std::mem::discriminant(&decl.default) != std::mem::discriminant(value) {
                return Err(ConfigError::Invalid {
                    field: format!("flags.{}", name),
                    reason: format!("expected a value like {}", decl.default),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::names;

    #[test]
    fn test_config_default_values() {
        let config = StoryConfig::default();
        assert_eq!(config.dialogue.reveal_interval_ms, 30);
        assert_eq!(config.toast.duration_ms, 3000);
        assert_eq!(config.storage.completion_key, "memory_device_completed");
        assert!((config.session.poison_chance - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = StoryConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoryConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = StoryConfig::from_toml_str(
            r#"
            [dialogue]
            reveal_interval_ms = 50

            [session]
            seed = 7

            [flags]
            wood_collected = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.dialogue.reveal_interval_ms, 50);
        assert_eq!(config.session.seed, 7);
        assert!((config.session.walk_speed - 70.0).abs() < f32::EPSILON);

        let schema = config.flag_schema();
        assert_eq!(
            schema.get(names::WOOD_COLLECTED).unwrap().default,
            FlagValue::Int(1)
        );
    }

    #[test]
    fn test_rejects_unknown_flag() {
        let err = StoryConfig::from_toml_str("[flags]\nfly = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_wrong_flag_kind() {
        let err = StoryConfig::from_toml_str("[flags]\ncat_found = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = StoryConfig::from_toml_str("[dialogue]\nreveal_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("reveal_interval_ms"));
    }

    #[test]
    fn test_builders() {
        let config = StoryConfig::default()
            .with_seed(9)
            .with_reveal_interval(10)
            .with_poison_chance(1.0);
        assert_eq!(config.session.seed, 9);
        assert_eq!(config.dialogue.reveal_interval_ms, 10);
        assert!((config.session.poison_chance - 1.0).abs() < f64::EPSILON);
    }
}

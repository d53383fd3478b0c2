use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Captchas registered at startup, before any command is served.
    #[serde(default)]
    pub captchas: Vec<CaptchaSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Policy switches for the counting and challenge engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_window_policy")]
    pub window_policy: WindowPolicy,
    /// Difficulty reported below the smallest threshold. Unset means the
    /// lowest configured difficulty of the captcha.
    #[serde(default)]
    pub fixed_floor_difficulty: Option<u32>,
    #[serde(default)]
    pub consume_challenge_on_read: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_policy: default_window_policy(),
            fixed_floor_difficulty: None,
            consume_challenge_on_read: false,
        }
    }
}

/// How a visitor counter's window is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// The window starts at the first increment and is never extended.
    Fixed,
    /// Every increment restarts the window.
    Sliding,
}

/// Difficulty reported while the count is below every configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorDifficulty {
    LowestLevel,
    Fixed(u32),
}

/// A captcha registered from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaSeed {
    pub id: String,
    pub levels: Vec<LevelConfig>,
    /// Visitor window in seconds.
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub visitor_threshold: u32,
    pub difficulty_factor: u32,
}

// Default value helpers
fn default_listen() -> String {
    "127.0.0.1:9190".to_string()
}
fn default_window_policy() -> WindowPolicy {
    WindowPolicy::Fixed
}

impl EngineConfig {
    pub fn floor(&self) -> FloorDifficulty {
        match self.fixed_floor_difficulty {
            Some(difficulty) => FloorDifficulty::Fixed(difficulty),
            None => FloorDifficulty::LowestLevel,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML document.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    ///
    /// Level ordering is checked again when each seed is registered; here
    /// only the shape of the file is verified.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen.trim().is_empty() {
            anyhow::bail!("server.listen must not be empty");
        }

        if self.engine.fixed_floor_difficulty == Some(0) {
            anyhow::bail!("engine.fixed_floor_difficulty must be greater than zero");
        }

        let mut seen = HashSet::new();
        for seed in &self.captchas {
            if !seen.insert(seed.id.as_str()) {
                anyhow::bail!("captcha '{}' is declared more than once", seed.id);
            }
            if seed.levels.is_empty() {
                anyhow::bail!("captcha '{}' has no defense levels", seed.id);
            }
            if seed.duration == 0 {
                anyhow::bail!("captcha '{}' must have a non-zero duration", seed.id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9190");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.window_policy, WindowPolicy::Fixed);
        assert_eq!(config.engine.floor(), FloorDifficulty::LowestLevel);
        assert!(!config.engine.consume_challenge_on_read);
        assert!(config.captchas.is_empty());
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
server:
  listen: "0.0.0.0:7000"
engine:
  window_policy: sliding
  fixed_floor_difficulty: 10
  consume_challenge_on_read: true
captchas:
  - id: login
    duration: 30
    levels:
      - visitor_threshold: 50
        difficulty_factor: 50
      - visitor_threshold: 500
        difficulty_factor: 500
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:7000");
        assert_eq!(config.engine.window_policy, WindowPolicy::Sliding);
        assert_eq!(config.engine.floor(), FloorDifficulty::Fixed(10));
        assert!(config.engine.consume_challenge_on_read);
        assert_eq!(config.captchas.len(), 1);
        assert_eq!(config.captchas[0].levels[1].difficulty_factor, 500);
    }

    #[test]
    fn rejects_zero_fixed_floor() {
        let yaml = "engine:\n  fixed_floor_difficulty: 0\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn rejects_duplicate_seeds() {
        let yaml = r#"
captchas:
  - id: a
    duration: 5
    levels: [{visitor_threshold: 1, difficulty_factor: 1}]
  - id: a
    duration: 5
    levels: [{visitor_threshold: 1, difficulty_factor: 1}]
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_seed_without_levels() {
        let yaml = "captchas:\n  - id: a\n    duration: 5\n    levels: []\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }
}

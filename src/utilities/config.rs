//! Service configuration.
//!
//! Defaults first, then an optional YAML file named by `CRITTERCHAT_CONFIG`,
//! then individual environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::persona::profile::PersonaProfile;
use crate::streaming::DelayProfile;
use crate::utilities::errors::ConfigError;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "CRITTERCHAT_CONFIG";

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub cat: PersonaProfile,
    pub goldfish: PersonaProfile,
    pub sloth: PersonaProfile,
    pub memory: MemoryConfig,
    pub reaper: ReaperConfig,
    pub stream: DelayProfile,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the text-generation engine lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of an Ollama-compatible server.
    pub base_url: String,
    /// Model tag to generate with.
    pub model: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "distilgpt2".to_string(),
            timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Goldfish memory retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Exchanges (user + reply pairs) kept per session.
    pub max_exchanges: usize,
    /// Chance of forgetting everything on each call.
    pub amnesia_probability: f64,
    /// Turns rendered into the prompt context.
    pub context_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_exchanges: 2,
            amnesia_probability: 0.3,
            context_turns: 6,
        }
    }
}

/// Background reaper cadence and caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    pub interval_secs: u64,
    /// Reap only when the store holds more than this many sessions.
    pub max_sessions: usize,
    /// Sessions left after a reap.
    pub retain_sessions: usize,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_sessions: 100,
            retain_sessions: 50,
        }
    }
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            cat: PersonaProfile::cat(),
            goldfish: PersonaProfile::goldfish(),
            sloth: PersonaProfile::sloth(),
            memory: MemoryConfig::default(),
            reaper: ReaperConfig::default(),
            stream: DelayProfile::default(),
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document. Missing sections keep their defaults; a persona
    /// section, when present, must be complete.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build the effective configuration from file and environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading config from {}", path);
                Self::from_file(path)?
            }
            _ => Self::new(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Takes a closure so tests do not
    /// need to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.engine.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.engine.model = model;
        }
        if let Some(v) = lookup("GOLDFISH_MAX_EXCHANGES") {
            self.memory.max_exchanges = parse_env("GOLDFISH_MAX_EXCHANGES", &v)?;
        }
        if let Some(v) = lookup("GOLDFISH_AMNESIA_PROBABILITY") {
            self.memory.amnesia_probability = parse_env("GOLDFISH_AMNESIA_PROBABILITY", &v)?;
        }
        if let Some(v) = lookup("REAPER_INTERVAL_SECS") {
            self.reaper.interval_secs = parse_env("REAPER_INTERVAL_SECS", &v)?;
        }
        Ok(())
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.memory.amnesia_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid(format!(
                "amnesia_probability must be within [0, 1], got {}",
                p
            )));
        }
        if self.memory.max_exchanges == 0 {
            return Err(ConfigError::Invalid("max_exchanges must be at least 1".into()));
        }
        if self.reaper.retain_sessions > self.reaper.max_sessions {
            return Err(ConfigError::Invalid(format!(
                "retain_sessions ({}) exceeds max_sessions ({})",
                self.reaper.retain_sessions, self.reaper.max_sessions
            )));
        }
        if self.reaper.interval_secs == 0 {
            return Err(ConfigError::Invalid("reaper interval must be non-zero".into()));
        }
        for (name, profile) in [
            ("cat", &self.cat),
            ("goldfish", &self.goldfish),
            ("sloth", &self.sloth),
        ] {
            profile
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("{} profile: {}", name, e)))?;
        }
        self.stream
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("stream: {}", e)))?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_validate() {
        let config = ChatConfig::new();
        config.validate().unwrap();
        assert_eq!(config.memory.max_exchanges, 2);
        assert_eq!(config.memory.amnesia_probability, 0.3);
        assert_eq!(config.reaper.max_sessions, 100);
        assert_eq!(config.reaper.retain_sessions, 50);
        assert_eq!(config.reaper.interval(), Duration::from_secs(3600));
        assert_eq!(config.goldfish.cue_marker, "Goldfish:");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "memory:\n  max_exchanges: 5\nreaper:\n  max_sessions: 10\n  retain_sessions: 4\n";
        let config = ChatConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.memory.max_exchanges, 5);
        assert_eq!(config.memory.amnesia_probability, 0.3);
        assert_eq!(config.reaper.max_sessions, 10);
        assert_eq!(config.sloth.cue_marker, "Sloth:");
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("critterchat.yaml");
        std::fs::write(&path, "server:\n  port: 9100\n").unwrap();
        let config = ChatConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:9100");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("OLLAMA_MODEL", "tinyllama"),
            ("GOLDFISH_AMNESIA_PROBABILITY", "0"),
        ]
        .into_iter()
        .collect();
        let mut config = ChatConfig::new();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.engine.model, "tinyllama");
        assert_eq!(config.memory.amnesia_probability, 0.0);
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut config = ChatConfig::new();
        let err = config
            .apply_env(|k| (k == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_unusable_stream_delays() {
        let yaml = "stream:\n  other:\n    base_secs: 1.0e20\n    jitter_secs: 0.2\n";
        let config = ChatConfig::from_yaml_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stream"), "{}", err);

        let yaml = "stream:\n  stall_secs: -1.0\n";
        assert!(ChatConfig::from_yaml_str(yaml).unwrap().validate().is_err());

        let yaml = "stream:\n  sentence_end:\n    base_secs: 2.0\n    jitter_secs: 1.0\n";
        ChatConfig::from_yaml_str(yaml).unwrap().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ChatConfig::new();
        config.memory.amnesia_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::new();
        config.reaper.retain_sessions = 200;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::new();
        config.memory.max_exchanges = 0;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::new();
        config.cat.max_tokens = 0;
        assert!(config.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::utils::{ConsoleError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostKind,
    pub kafka: KafkaConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// Which host command processor answers the console's commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    #[default]
    Memory,
    Kafka,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub group_id: String,
    /// Topic the demo produces to and consumes from.
    pub topic: String,
    pub security: Option<SecurityConfig>,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub protocol: String,
    pub sasl: Option<SaslConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaslConfig {
    pub mechanism: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub acks: String,
    pub message_timeout_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            acks: "all".to_string(),
            message_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub auto_offset_reset: String,
    pub enable_auto_commit: bool,
    pub metadata_timeout_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            auto_offset_reset: "latest".to_string(),
            enable_auto_commit: true,
            metadata_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    /// Consumed records kept in the message log panel.
    pub max_log_lines: usize,
    pub keys: KeyBindings,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            max_log_lines: 500,
            keys: KeyBindings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub produce: char,
    pub consume: char,
    pub stop_consume: char,
    pub list_topics: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            produce: 'p',
            consume: 'c',
            stop_consume: 's',
            list_topics: 'l',
        }
    }
}

impl KeyBindings {
    fn all(&self) -> [char; 4] {
        [self.produce, self.consume, self.stop_consume, self.list_topics]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("broker-console.log".to_string()),
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            client_id: "broker-console".to_string(),
            group_id: "broker-console".to_string(),
            topic: "rust".to_string(),
            security: None,
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HostKind::default(),
            kafka: KafkaConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where a loaded configuration came from. Loading runs before the
/// subscriber exists, so the caller logs this once tracing is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    CreatedDefault,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();

        if !path.exists() {
            let default_config = Config::default();
            default_config.save(path)?;
            return Ok((default_config, ConfigSource::CreatedDefault));
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;

        Ok((config, ConfigSource::File))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn set_default_broker(&mut self, broker: String) {
        self.kafka.brokers = vec![broker];
    }

    pub fn validate(&self) -> Result<()> {
        if self.kafka.brokers.is_empty() {
            return Err(ConsoleError::Config(
                "At least one Kafka broker must be configured".to_string(),
            ));
        }

        for broker in &self.kafka.brokers {
            if !broker.contains(':') {
                return Err(ConsoleError::Config(format!(
                    "Invalid broker format: {}. Expected format: host:port",
                    broker
                )));
            }
        }

        if self.kafka.client_id.is_empty() {
            return Err(ConsoleError::Config("Client ID cannot be empty".to_string()));
        }

        if self.kafka.topic.is_empty() {
            return Err(ConsoleError::Config("Topic cannot be empty".to_string()));
        }

        if let Some(security) = &self.kafka.security {
            match security.protocol.as_str() {
                "PLAINTEXT" | "SSL" | "SASL_PLAINTEXT" | "SASL_SSL" => {}
                _ => {
                    return Err(ConsoleError::Config(format!(
                        "Invalid security protocol: {}",
                        security.protocol
                    )))
                }
            }

            if security.protocol.contains("SASL") && security.sasl.is_none() {
                return Err(ConsoleError::Config(
                    "SASL configuration is required when using SASL protocol".to_string(),
                ));
            }
        }

        let keys = self.ui.keys.all();
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(ConsoleError::Config(format!("Key '{}' is bound twice", key)));
            }
            // Hard-bound in normal mode
            if matches!(*key, 'q' | ':' | 'j' | 'k' | ' ') {
                return Err(ConsoleError::Config(format!("Key '{}' is reserved", key)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kafka.topic, "rust");
        assert_eq!(config.host, HostKind::Memory);
    }

    #[test]
    fn rejects_broker_without_port() {
        let mut config = Config::default();
        config.set_default_broker("localhost".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid broker format"));
    }

    #[test]
    fn rejects_sasl_without_credentials_block() {
        let mut config = Config::default();
        config.kafka.security = Some(SecurityConfig {
            protocol: "SASL_SSL".to_string(),
            sasl: None,
        });
        assert!(matches!(config.validate(), Err(ConsoleError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_and_reserved_keys() {
        let mut config = Config::default();
        config.ui.keys.consume = 'p';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ui.keys.list_topics = 'q';
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_keys_used_for_scrolling_and_activation() {
        for key in ['j', 'k', ' '] {
            let mut config = Config::default();
            config.ui.keys.produce = key;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("is reserved"), "{:?} accepted", key);
        }
    }

    #[test]
    fn missing_host_defaults_to_memory() {
        let yaml = serde_yaml::to_string(&Config::default())
            .unwrap()
            .replace("host: memory\n", "");
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.host, HostKind::Memory);
    }

    #[test]
    fn load_writes_default_when_missing() {
        let dir = std::env::temp_dir().join(format!("broker-console-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.yaml");

        let (config, source) = Config::load(&path).unwrap();
        assert_eq!(source, ConfigSource::CreatedDefault);
        assert!(path.exists());
        assert_eq!(config.kafka.brokers, vec!["localhost:9092".to_string()]);

        let (reloaded, source) = Config::load(&path).unwrap();
        assert_eq!(source, ConfigSource::File);
        assert_eq!(reloaded.ui.keys, KeyBindings::default());

        let _ = fs::remove_dir_all(dir);
    }
}

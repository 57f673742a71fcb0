use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[cfg(feature = "kafka")]
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

#[cfg(feature = "kafka")]
impl ConsoleError {
    /// Failure payload handed back across the host command boundary.
    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

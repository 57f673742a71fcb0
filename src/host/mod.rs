//! Host command boundary.
//!
//! Everything the console asks of the broker goes through [`HostCommands::invoke`]:
//! a command name, an argument map, and an asynchronous answer whose shape the
//! caller does not know in advance. Both success and failure payloads are plain
//! JSON values.

pub mod memory;
#[cfg(feature = "kafka")]
pub mod kafka;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub type CommandArgs = Map<String, Value>;

/// Settled result of a host command: `Ok` resolves, `Err` rejects.
pub type Outcome = std::result::Result<Value, Value>;

#[async_trait]
pub trait HostCommands: Send + Sync {
    async fn invoke(&self, name: &str, args: CommandArgs) -> Outcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    SendMessage,
    Consume,
    StopConsumer,
    ListTopics,
}

impl CommandName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::SendMessage => "send_message",
            CommandName::Consume => "consume",
            CommandName::StopConsumer => "stop_consumer",
            CommandName::ListTopics => "list_topics",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "send_message" => Some(CommandName::SendMessage),
            "consume" => Some(CommandName::Consume),
            "stop_consumer" => Some(CommandName::StopConsumer),
            "list_topics" => Some(CommandName::ListTopics),
            _ => None,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call to the host, built at activation time and dropped once issued.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub id: Uuid,
    pub name: CommandName,
    pub args: CommandArgs,
}

impl CommandRequest {
    pub fn new(name: CommandName) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            args: CommandArgs::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }
}

/// Events pushed by a host outside of any command's answer.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A consumed record, the `update-message` event.
    MessageReceived(ConsumedMessage),
    /// A broker-side failure outside any command, such as a failed poll.
    #[cfg(feature = "kafka")]
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumedMessage {
    pub key: Option<String>,
    pub payload: String,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<i64>,
}

impl ConsumedMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Reads a required integer argument, rejecting the call the way the host
/// runtime rejects a malformed payload.
pub(crate) fn integer_arg(command: CommandName, args: &CommandArgs, key: &str) -> Outcome {
    match args.get(key) {
        Some(value) if value.is_i64() => Ok(value.clone()),
        Some(value) => Err(Value::String(format!(
            "invalid args `{}` for command `{}`: expected an integer, got {}",
            key, command, value
        ))),
        None => Err(Value::String(format!(
            "invalid args `{}` for command `{}`: command {} missing required key {}",
            key, command, command, key
        ))),
    }
}

pub(crate) fn unknown_command(name: &str) -> Value {
    Value::String(format!("unknown command: {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_names_match_wire_names() {
        for name in [
            CommandName::SendMessage,
            CommandName::Consume,
            CommandName::StopConsumer,
            CommandName::ListTopics,
        ] {
            assert_eq!(CommandName::parse(name.as_str()), Some(name));
        }
        assert_eq!(CommandName::parse("greet"), None);
    }

    #[test]
    fn request_carries_arguments() {
        let request = CommandRequest::new(CommandName::SendMessage).with_arg("numOfMessages", 1);
        assert_eq!(request.args.get("numOfMessages"), Some(&json!(1)));
        assert_eq!(request.name.to_string(), "send_message");
    }

    #[test]
    fn integer_arg_rejects_missing_and_mistyped_values() {
        let mut args = CommandArgs::new();
        assert!(integer_arg(CommandName::SendMessage, &args, "numOfMessages").is_err());

        args.insert("numOfMessages".to_string(), json!("one"));
        assert!(integer_arg(CommandName::SendMessage, &args, "numOfMessages").is_err());

        args.insert("numOfMessages".to_string(), json!(3));
        assert_eq!(
            integer_arg(CommandName::SendMessage, &args, "numOfMessages"),
            Ok(json!(3))
        );
    }

    #[test]
    fn consumed_message_serializes_like_update_event() {
        let message = ConsumedMessage {
            key: Some("key-1".to_string()),
            payload: "value-1".to_string(),
            topic: "rust".to_string(),
            partition: 0,
            offset: 4,
            timestamp: Some(1_700_000_000_000),
        };
        assert_eq!(
            message.to_json(),
            r#"{"key":"key-1","payload":"value-1","topic":"rust","partition":0,"offset":4,"timestamp":1700000000000}"#
        );
    }
}

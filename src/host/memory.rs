//! In-process broker used when no real cluster is configured.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::{
    integer_arg, unknown_command, CommandArgs, CommandName, ConsumedMessage, HostCommands,
    HostEvent, Outcome,
};
use crate::config::KafkaConfig;

#[derive(Debug, Clone)]
struct StoredRecord {
    key: Option<String>,
    payload: String,
    timestamp: i64,
}

#[derive(Debug, Default)]
struct BrokerState {
    topics: BTreeMap<String, Vec<StoredRecord>>,
    /// Next offset the consumer group reads from the demo topic.
    committed: Option<usize>,
    subscribed: bool,
    /// Bumped on every unsubscribe so running consume loops can tell they are stale.
    generation: u64,
}

pub struct MemoryBroker {
    topic: String,
    from_earliest: bool,
    state: Mutex<BrokerState>,
    changes: watch::Sender<u64>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl MemoryBroker {
    pub fn new(config: &KafkaConfig, events: mpsc::UnboundedSender<HostEvent>) -> Self {
        let mut state = BrokerState::default();
        state.topics.insert(config.topic.clone(), Vec::new());
        state.topics.insert("__consumer_offsets".to_string(), Vec::new());

        let (changes, _) = watch::channel(0);

        Self {
            topic: config.topic.clone(),
            from_earliest: config.consumer.auto_offset_reset == "earliest",
            state: Mutex::new(state),
            changes,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    fn send_message(&self, args: &CommandArgs) -> Outcome {
        let count = integer_arg(CommandName::SendMessage, args, "numOfMessages")?
            .as_i64()
            .unwrap_or_default();

        {
            let mut state = self.lock();
            let log = state.topics.entry(self.topic.clone()).or_default();
            for i in 1..=count {
                debug!("sending message key-{} to {}", i, self.topic);
                log.push(StoredRecord {
                    key: Some(format!("key-{}", i)),
                    payload: format!("value-{}", i),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
            }
        }
        self.notify();

        Ok(Value::String(format!("sent {} to {} topic", count, self.topic)))
    }

    async fn consume(&self) -> Outcome {
        let mut changes = self.changes.subscribe();
        let generation = {
            let mut state = self.lock();
            if !state.subscribed {
                state.subscribed = true;
                info!("Subscribed to {}", self.topic);
            }
            if state.committed.is_none() {
                let end = state.topics.get(&self.topic).map_or(0, Vec::len);
                state.committed = Some(if self.from_earliest { 0 } else { end });
            }
            state.generation
        };

        let mut consumed = 0u64;
        loop {
            changes.borrow_and_update();

            let batch = {
                let mut state = self.lock();
                if state.generation != generation {
                    break;
                }
                let start = state.committed.unwrap_or_default();
                let records: Vec<(usize, StoredRecord)> = state
                    .topics
                    .get(&self.topic)
                    .map(|log| log.iter().cloned().enumerate().skip(start).collect())
                    .unwrap_or_default();
                state.committed = Some(start + records.len());
                records
            };

            if batch.is_empty() {
                if changes.changed().await.is_err() {
                    break;
                }
                continue;
            }

            for (offset, record) in batch {
                let message = ConsumedMessage {
                    key: record.key,
                    payload: record.payload,
                    topic: self.topic.clone(),
                    partition: 0,
                    offset: offset as i64,
                    timestamp: Some(record.timestamp),
                };
                debug!("{}", message.to_json());
                consumed += 1;
                if self.events.send(HostEvent::MessageReceived(message)).is_err() {
                    debug!("No listener for consumed messages");
                }
            }
        }

        info!("Consumer loop on {} finished after {} messages", self.topic, consumed);
        Ok(json!({ "topic": self.topic, "consumed": consumed }))
    }

    fn stop_consumer(&self) -> Outcome {
        {
            let mut state = self.lock();
            state.subscribed = false;
            state.generation += 1;
        }
        self.notify();
        info!("Unsubscribed from {}", self.topic);
        Ok(Value::Null)
    }

    fn list_topics(&self) -> Outcome {
        let topics: Vec<Value> = self
            .lock()
            .topics
            .keys()
            .filter(|name| !name.starts_with("__"))
            .map(|name| Value::String(name.clone()))
            .collect();

        debug!("Listed {} topics", topics.len());
        Ok(Value::Array(topics))
    }
}

#[async_trait]
impl HostCommands for MemoryBroker {
    async fn invoke(&self, name: &str, args: CommandArgs) -> Outcome {
        match CommandName::parse(name) {
            Some(CommandName::SendMessage) => self.send_message(&args),
            Some(CommandName::Consume) => self.consume().await,
            Some(CommandName::StopConsumer) => self.stop_consumer(),
            Some(CommandName::ListTopics) => self.list_topics(),
            None => Err(unknown_command(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn broker() -> (Arc<MemoryBroker>, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(MemoryBroker::new(&KafkaConfig::default(), tx)), rx)
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<HostEvent>) -> ConsumedMessage {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            HostEvent::MessageReceived(message) => message,
            #[allow(unreachable_patterns)]
            other => panic!("unexpected event {:?}", other),
        }
    }

    fn send_args(count: i64) -> CommandArgs {
        let mut args = CommandArgs::new();
        args.insert("numOfMessages".to_string(), json!(count));
        args
    }

    #[tokio::test]
    async fn send_message_acknowledges_with_text() {
        let (broker, _rx) = broker();
        let outcome = broker.invoke("send_message", send_args(1)).await;
        assert_eq!(outcome, Ok(json!("sent 1 to rust topic")));
    }

    #[tokio::test]
    async fn send_message_without_count_is_rejected() {
        let (broker, _rx) = broker();
        let outcome = broker.invoke("send_message", CommandArgs::new()).await;
        let err = outcome.unwrap_err();
        assert!(err.as_str().unwrap().contains("numOfMessages"));
    }

    #[tokio::test]
    async fn list_topics_hides_internal_topics() {
        let (broker, _rx) = broker();
        broker.lock().topics.insert("orders".to_string(), Vec::new());
        let outcome = broker.invoke("list_topics", CommandArgs::new()).await;
        assert_eq!(outcome, Ok(json!(["orders", "rust"])));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let (broker, _rx) = broker();
        let outcome = broker.invoke("greet", CommandArgs::new()).await;
        assert_eq!(outcome, Err(json!("unknown command: greet")));
    }

    #[tokio::test]
    async fn consume_streams_until_stopped() {
        let (broker, mut rx) = broker();

        let consumer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.invoke("consume", CommandArgs::new()).await })
        };
        while !broker.lock().subscribed {
            tokio::task::yield_now().await;
        }

        broker.invoke("send_message", send_args(2)).await.unwrap();

        for expected in ["value-1", "value-2"] {
            assert_eq!(next_message(&mut rx).await.payload, expected);
        }

        assert_eq!(broker.invoke("stop_consumer", CommandArgs::new()).await, Ok(Value::Null));
        let outcome = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Ok(json!({ "topic": "rust", "consumed": 2 })));
    }

    #[tokio::test]
    async fn consumer_group_resumes_from_committed_offset() {
        let (broker, mut rx) = broker();

        let first = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.invoke("consume", CommandArgs::new()).await })
        };
        while !broker.lock().subscribed {
            tokio::task::yield_now().await;
        }
        broker.invoke("send_message", send_args(1)).await.unwrap();
        next_message(&mut rx).await;
        broker.invoke("stop_consumer", CommandArgs::new()).await.unwrap();
        first.await.unwrap().unwrap();

        // Produced while nobody is subscribed; picked up on the next consume.
        broker.invoke("send_message", send_args(1)).await.unwrap();

        let second = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.invoke("consume", CommandArgs::new()).await })
        };
        assert_eq!(next_message(&mut rx).await.offset, 1);

        broker.invoke("stop_consumer", CommandArgs::new()).await.unwrap();
        assert_eq!(
            second.await.unwrap(),
            Ok(json!({ "topic": "rust", "consumed": 1 }))
        );
    }
}

//! Host backed by a real cluster through librdkafka.

use async_trait::async_trait;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{Consumer, ConsumerContext, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{ClientContext, Message, TopicPartitionList};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use super::{
    integer_arg, unknown_command, CommandArgs, CommandName, ConsumedMessage, HostCommands,
    HostEvent, Outcome,
};
use crate::config::KafkaConfig;
use crate::utils::{ConsoleError, Result};

pub struct LoggingContext;

impl ClientContext for LoggingContext {}

impl ConsumerContext for LoggingContext {
    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        debug!("Committing offsets: {:?}", result);
    }
}

type LoggingConsumer = StreamConsumer<LoggingContext>;

pub struct KafkaHost {
    producer: FutureProducer,
    consumer: LoggingConsumer,
    topic: String,
    send_timeout: Duration,
    metadata_timeout: Duration,
    stop: watch::Sender<u64>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl KafkaHost {
    pub fn new(config: &KafkaConfig, events: mpsc::UnboundedSender<HostEvent>) -> Result<Self> {
        let mut client_config = ClientConfig::new();

        client_config.set("bootstrap.servers", config.brokers.join(","));
        client_config.set("client.id", &config.client_id);

        if let Some(security) = &config.security {
            client_config.set("security.protocol", &security.protocol);

            if let Some(sasl) = &security.sasl {
                client_config.set("sasl.mechanism", &sasl.mechanism);
                if let Some(username) = &sasl.username {
                    client_config.set("sasl.username", username);
                }
                if let Some(password) = &sasl.password {
                    client_config.set("sasl.password", password);
                }
            }
        }

        let producer: FutureProducer = client_config
            .clone()
            .set("acks", &config.producer.acks)
            .create()?;

        let consumer: LoggingConsumer = client_config
            .clone()
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", config.consumer.enable_auto_commit.to_string())
            .set("auto.offset.reset", &config.consumer.auto_offset_reset)
            .set_log_level(RDKafkaLogLevel::Info)
            .create_with_context(LoggingContext)?;

        Ok(Self {
            producer,
            consumer,
            topic: config.topic.clone(),
            send_timeout: Duration::from_millis(config.producer.message_timeout_ms),
            metadata_timeout: Duration::from_millis(config.consumer.metadata_timeout_ms),
            stop: watch::channel(0).0,
            events,
        })
    }

    async fn send_message(&self, args: &CommandArgs) -> Outcome {
        let count = integer_arg(CommandName::SendMessage, args, "numOfMessages")?
            .as_i64()
            .unwrap_or_default();

        for i in 1..=count {
            let key = format!("key-{}", i);
            let payload = format!("value-{}", i);
            let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

            match self.producer.send(record, self.send_timeout).await {
                Ok((partition, offset)) => {
                    debug!(
                        "Message delivered to topic: {}, partition: {}, offset: {}",
                        self.topic, partition, offset
                    );
                }
                Err((e, _)) => {
                    error!("Failed to deliver message: {}", e);
                    return Err(ConsoleError::Kafka(e).into_value());
                }
            }
        }

        Ok(Value::String(format!("sent {} to {} topic", count, self.topic)))
    }

    async fn consume(&self) -> Outcome {
        let mut stop = self.stop.subscribe();
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| ConsoleError::Kafka(e).into_value())?;
        info!("Subscribed to {}", self.topic);

        let mut consumed = 0u64;
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                received = self.consumer.recv() => match received {
                    Err(e) => {
                        error!("Kafka error: {}", e);
                        if self.events.send(HostEvent::Error(e.to_string())).is_err() {
                            debug!("No listener for host errors");
                        }
                    }
                    Ok(m) => {
                        let payload = match m.payload_view::<str>() {
                            None => "",
                            Some(Ok(s)) => s,
                            Some(Err(e)) => {
                                error!("Error while deserializing message payload: {:?}", e);
                                ""
                            }
                        };
                        let key = m.key_view::<str>().and_then(|k| k.ok()).map(str::to_string);

                        let message = ConsumedMessage {
                            key,
                            payload: payload.to_string(),
                            topic: m.topic().to_string(),
                            partition: m.partition(),
                            offset: m.offset(),
                            timestamp: m.timestamp().to_millis(),
                        };
                        debug!("{}", message.to_json());
                        consumed += 1;
                        if self.events.send(HostEvent::MessageReceived(message)).is_err() {
                            debug!("No listener for consumed messages");
                        }
                    }
                },
            }
        }

        Ok(json!({ "topic": self.topic, "consumed": consumed }))
    }

    fn stop_consumer(&self) -> Outcome {
        self.consumer.unsubscribe();
        self.stop.send_modify(|generation| *generation += 1);
        info!("Unsubscribed from {}", self.topic);
        Ok(Value::Null)
    }

    // Metadata fetches block for up to the metadata timeout.
    fn list_topics(&self) -> Outcome {
        let metadata = tokio::task::block_in_place(|| {
            self.consumer.fetch_metadata(None, self.metadata_timeout)
        })
        .map_err(|e| ConsoleError::Kafka(e).into_value())?;

        let topics: Vec<Value> = metadata
            .topics()
            .iter()
            .filter(|topic| !topic.name().starts_with("__"))
            .map(|topic| Value::String(topic.name().to_string()))
            .collect();

        debug!("Listed {} topics", topics.len());
        Ok(Value::Array(topics))
    }
}

#[async_trait]
impl HostCommands for KafkaHost {
    async fn invoke(&self, name: &str, args: CommandArgs) -> Outcome {
        match CommandName::parse(name) {
            Some(CommandName::SendMessage) => self.send_message(&args).await,
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

    // Nothing listens on port 1, so every broker request fails fast.
    fn unreachable_host(events: mpsc::UnboundedSender<HostEvent>) -> KafkaHost {
        let mut config = KafkaConfig::default();
        config.brokers = vec!["127.0.0.1:1".to_string()];
        config.consumer.metadata_timeout_ms = 200;
        KafkaHost::new(&config, events).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_topics_failure_comes_back_as_text() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = unreachable_host(tx);

        let outcome = host.invoke("list_topics", CommandArgs::new()).await;

        let err = outcome.unwrap_err();
        assert!(err.as_str().unwrap().starts_with("Kafka error"), "{:?}", err);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consume_ends_on_stop_without_event_listener() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let host = std::sync::Arc::new(unreachable_host(tx));

        let consumer = {
            let host = std::sync::Arc::clone(&host);
            tokio::spawn(async move { host.invoke("consume", CommandArgs::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(host.invoke("stop_consumer", CommandArgs::new()).await, Ok(Value::Null));
        let outcome = tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Ok(json!({ "topic": "rust", "consumed": 0 })));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = unreachable_host(tx);
        let outcome = host.invoke("greet", CommandArgs::new()).await;
        assert_eq!(outcome, Err(json!("unknown command: greet")));
    }
}

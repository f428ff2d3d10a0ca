use std::future::Future;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::KafkaEventError;

/// Settings for one consumer group membership.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub brokers: String,
    pub group_id: String,
    pub topics: Vec<String>,
}

/// Kafka consumer loop delegating each message to an async handler.
///
/// The loop runs until the shutdown channel flips to `true` or the broker
/// stream ends. Handler failures are the handler's business; the loop keeps
/// consuming regardless.
pub struct EventConsumer {
    consumer: StreamConsumer,
    shutdown: watch::Receiver<bool>,
}

impl EventConsumer {
    pub fn new(
        settings: &ConsumerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, KafkaEventError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("group.id", &settings.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "earliest")
            .create()?;

        let topics: Vec<&str> = settings.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;

        info!(
            brokers = %settings.brokers,
            group_id = %settings.group_id,
            topics = ?settings.topics,
            "kafka consumer subscribed"
        );

        Ok(Self { consumer, shutdown })
    }

    /// Consume until shutdown, passing each received message to `handler`.
    pub async fn run<F, Fut>(&mut self, handler: F)
    where
        F: Fn(OwnedMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        use futures::StreamExt;

        let mut stream = self.consumer.stream();

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped sender means nobody can ever signal us; treat
                    // it as a stop instead of spinning on the closed channel.
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("shutdown signal received, stopping consumer");
                        break;
                    }
                }
                message = stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "message received"
                            );
                            handler(msg.detach()).await;
                        }
                        Some(Err(e)) => {
                            // Transient broker errors; keep consuming.
                            error!(error = %e, "kafka consumer error");
                        }
                        None => {
                            warn!("message stream ended unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        info!("kafka consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> ConsumerSettings {
        ConsumerSettings {
            // Client creation and subscription are local operations; no
            // broker has to be listening here.
            brokers: "127.0.0.1:1".into(),
            group_id: "test-group".into(),
            topics: vec!["events.test".into()],
        }
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (tx, rx) = watch::channel(false);
        let mut consumer = EventConsumer::new(&settings(), rx).unwrap();

        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), consumer.run(|_msg| async {}))
            .await
            .expect("consumer must stop once the signal flips to true");
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_sender_is_dropped() {
        let (tx, rx) = watch::channel(false);
        let mut consumer = EventConsumer::new(&settings(), rx).unwrap();

        drop(tx);

        // Must exit rather than busy-spin on the closed channel.
        tokio::time::timeout(Duration::from_secs(5), consumer.run(|_msg| async {}))
            .await
            .expect("consumer must stop when the shutdown sender is gone");
    }
}

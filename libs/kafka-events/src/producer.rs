use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Envelope, KafkaEventError};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON event producer with a default topic.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
}

impl EventProducer {
    /// Create a producer for `brokers` (comma-separated list).
    pub fn new(brokers: &str, client_id: &str, topic: &str) -> Result<Self, KafkaEventError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "5000")
            .create::<FutureProducer>()?;

        info!(brokers, client_id, topic, "kafka producer created");

        Ok(Self {
            producer,
            topic: topic.to_owned(),
        })
    }

    /// Publish `data` to the default topic, keyed by `key`.
    pub async fn publish<T: Serialize>(&self, key: &str, data: T) -> Result<(), KafkaEventError> {
        self.publish_to(&self.topic, key, data).await
    }

    /// Publish `data` to an explicit topic, keyed by `key`.
    ///
    /// The payload is wrapped in an [`Envelope`] whose event name is the
    /// topic. Delivery is awaited; a broker-side failure is returned.
    pub async fn publish_to<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        data: T,
    ) -> Result<(), KafkaEventError> {
        let envelope = Envelope::build(data, topic)?;
        let payload = serde_json::to_vec(&envelope)?;

        let record = FutureRecord::to(topic).payload(&payload).key(key);
        self.producer
            .send(record, DELIVERY_TIMEOUT)
            .await
            .map_err(|(source, _)| KafkaEventError::Delivery {
                topic: topic.to_owned(),
                source,
            })?;

        debug!(topic, event_id = %envelope.metadata.event_id, "event published");
        Ok(())
    }
}

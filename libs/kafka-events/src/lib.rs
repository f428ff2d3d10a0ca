//! Kafka message contracts shared by producers and consumers.
//!
//! Every message on the wire is a JSON [`Envelope`]: the caller's payload
//! plus [`Metadata`] identifying the emitting host, the event name and a
//! content hash consumers can use for integrity checks and deduplication.

mod consumer;
mod producer;

pub use consumer::{ConsumerSettings, EventConsumer};
pub use producer::EventProducer;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum KafkaEventError {
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("kafka client error: {0}")]
    Client(#[from] rdkafka::error::KafkaError),

    #[error("failed to deliver event to topic {topic}: {source}")]
    Delivery {
        topic: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },
}

/// Wire format of every published message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Unique event id for idempotent consumption and tracing.
    pub event_id: Uuid,
    /// Hostname of the emitting process.
    pub emit_host: String,
    /// Emission time as a Unix timestamp, seconds.
    pub emit_time: i64,
    /// Event name; by convention the destination topic.
    pub event: String,
    /// Base64-encoded SHA-256 of the serialized payload.
    pub hash: String,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap `data` for publication under the event name `event`.
    pub fn build(data: T, event: &str) -> Result<Self, KafkaEventError> {
        let hash = hash_payload(&data)?;
        let now = Utc::now();
        Ok(Self {
            data,
            metadata: Metadata {
                event_id: Uuid::new_v4(),
                emit_host: emit_host(),
                emit_time: now.timestamp(),
                event: event.to_owned(),
                hash,
                timestamp: now,
            },
        })
    }
}

/// Decode a received payload back into an [`Envelope`].
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<Envelope<T>, KafkaEventError> {
    Ok(serde_json::from_slice(payload)?)
}

fn hash_payload<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(data)?;
    Ok(BASE64.encode(Sha256::digest(&bytes)))
}

fn emit_host() -> String {
    // Containers expose the pod/container name here; fall back rather than fail.
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct OrderPlaced {
        order_id: u64,
        amount_cents: i64,
    }

    #[test]
    fn hash_is_deterministic_per_payload() {
        let a = OrderPlaced { order_id: 1, amount_cents: 100 };
        let b = OrderPlaced { order_id: 2, amount_cents: 100 };

        assert_eq!(hash_payload(&a).unwrap(), hash_payload(&a).unwrap());
        assert_ne!(hash_payload(&a).unwrap(), hash_payload(&b).unwrap());
    }

    #[test]
    fn envelope_carries_event_name_and_hash() {
        let data = OrderPlaced { order_id: 7, amount_cents: 250 };
        let envelope = Envelope::build(data.clone(), "orders.placed").unwrap();

        assert_eq!(envelope.metadata.event, "orders.placed");
        assert_eq!(envelope.metadata.hash, hash_payload(&data).unwrap());
        assert!(envelope.metadata.emit_time > 0);
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let data = OrderPlaced { order_id: 7, amount_cents: 250 };
        let envelope = Envelope::build(data.clone(), "orders.placed").unwrap();

        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope<OrderPlaced> = decode(&bytes).unwrap();

        assert_eq!(decoded.data, data);
        assert_eq!(decoded.metadata.event_id, envelope.metadata.event_id);
        assert_eq!(decoded.metadata.hash, envelope.metadata.hash);
    }

    #[test]
    fn decode_rejects_junk() {
        assert!(decode::<OrderPlaced>(b"not json").is_err());
    }
}

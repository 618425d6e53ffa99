//! Kafka/Redpanda event notifier
//!
//! Publishes reservation lifecycle events to the message bus. Delivery is
//! at-most-once: a failed publish is logged and dropped, it never affects
//! the reservation that triggered it. With no brokers configured the
//! process runs with a no-op notifier (the original behavior when the bus
//! is down at startup).

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{debug, error, info};

use crate::application::events::{EventNotifier, ReservationCreated};

const CREATED_TOPIC: &str = "herd.reservations.created";
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaEventNotifier {
    producer: FutureProducer,
}

impl KafkaEventNotifier {
    /// Connect a producer to the given bootstrap brokers.
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "1")
            .create()?;
        info!(brokers, "Event notifier connected");
        Ok(Self { producer })
    }
}

#[async_trait]
impl EventNotifier for KafkaEventNotifier {
    async fn publish_created(&self, event: &ReservationCreated) {
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to serialize reservation event");
                return;
            }
        };
        let key = event.reservation_id.to_string();
        let record = FutureRecord::to(CREATED_TOPIC).payload(&payload).key(&key);

        match self.producer.send(record, Timeout::After(SEND_TIMEOUT)).await {
            Ok((partition, offset)) => {
                debug!(
                    topic = CREATED_TOPIC,
                    partition,
                    offset,
                    reservation_id = %event.reservation_id,
                    "Reservation event published"
                );
            }
            Err((kafka_error, _)) => {
                error!(
                    topic = CREATED_TOPIC,
                    error = %kafka_error,
                    reservation_id = %event.reservation_id,
                    "Failed to publish reservation event"
                );
            }
        }
    }
}

/// Used when no brokers are configured; events are skipped.
pub struct NoopEventNotifier;

#[async_trait]
impl EventNotifier for NoopEventNotifier {
    async fn publish_created(&self, event: &ReservationCreated) {
        debug!(
            reservation_id = %event.reservation_id,
            "Event bus not configured; skipping reservation event"
        );
    }
}

use std::time::Duration;

use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{create_kafka_producer, KafkaContext};
use futures::FutureExt;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{error, info};

use super::{DeliveryAck, MessageSink};
use crate::error::{DeliveryError, PublishError};

pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig) -> Result<KafkaSink, KafkaError> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);
        let producer = create_kafka_producer(config)?;
        Ok(KafkaSink { producer })
    }

    pub fn from_producer(producer: FutureProducer<KafkaContext>) -> Self {
        KafkaSink { producer }
    }
}

impl MessageSink for KafkaSink {
    fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<DeliveryAck, PublishError> {
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        match self.producer.send_result(record) {
            Ok(delivery) => Ok(async move {
                match delivery.await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err((err, _))) => Err(DeliveryError::Broker(err)),
                    // Cancelled due to timeout while retrying
                    Err(_) => Err(DeliveryError::Canceled),
                }
            }
            .boxed()),
            Err((e, _)) => {
                error!("failed to enqueue message for {}: {}", topic, e);
                Err(PublishError::Enqueue(e))
            }
        }
    }

    fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        match self.producer.flush(timeout) {
            Ok(()) => Ok(()),
            Err(KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut)) => {
                Err(PublishError::FlushTimeout {
                    outstanding: self.producer.in_flight_count().max(0) as usize,
                })
            }
            Err(e) => Err(PublishError::Flush(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_kafka::test::create_mock_kafka;
    use rdkafka::types::{RDKafkaApiKey, RDKafkaRespErr};

    use super::*;
    use crate::emit::avro::AvroSerializer;
    use crate::emit::Publisher;
    use crate::normalize::NormalizedRecord;
    use crate::schema::SchemaHandle;

    const SCHEMA: &str = r#"{"type":"record","name":"V","fields":[{"name":"TITLE","type":"string"},{"name":"VIEWS","type":"long"},{"name":"LIKES","type":"long"},{"name":"COMMENTS","type":"long"}]}"#;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            id: "abc".to_string(),
            title: "Example".to_string(),
            view_count: 5,
            like_count: 0,
            comment_count: 0,
        }
    }

    #[tokio::test]
    async fn kafka_sink_delivery_handling() {
        // Uses a mocked Kafka broker that allows injecting write errors.
        // Cases share one producer to amortize its startup cost.
        let (cluster, producer) = create_mock_kafka();
        let sink = KafkaSink::from_producer(producer);

        // Wait for the producer to be healthy
        for _ in 0..20 {
            let ack = sink.send("youtube_videos", "warmup", vec![1]).unwrap();
            if ack.await.is_ok() {
                break;
            }
        }

        sink.send("youtube_videos", "abc", vec![0, 1, 2])
            .unwrap()
            .await
            .expect("failed to deliver on the happy path");
        sink.flush(Duration::from_secs(5)).expect("flush failed");

        // Unretriable broker errors come back through the ack, not from send
        cluster.clear_request_errors(RDKafkaApiKey::Produce);
        let err = [RDKafkaRespErr::RD_KAFKA_RESP_ERR_MSG_SIZE_TOO_LARGE; 1];
        cluster.request_errors(RDKafkaApiKey::Produce, &err);
        let ack = sink.send("youtube_videos", "abc", vec![0, 1, 2]).unwrap();
        match ack.await {
            Err(DeliveryError::Broker(_)) => {}
            other => panic!("expected broker error, got {other:?}"),
        }

        // Transient errors are retried by the producer
        cluster.clear_request_errors(RDKafkaApiKey::Produce);
        let err = [RDKafkaRespErr::RD_KAFKA_RESP_ERR_BROKER_NOT_AVAILABLE; 2];
        cluster.request_errors(RDKafkaApiKey::Produce, &err);
        sink.send("youtube_videos", "abc", vec![0, 1, 2])
            .unwrap()
            .await
            .expect("failed to deliver after recovery");
        cluster.clear_request_errors(RDKafkaApiKey::Produce);
    }

    #[tokio::test]
    async fn publisher_over_mock_kafka() {
        let (_cluster, producer) = create_mock_kafka();
        let sink = Arc::new(KafkaSink::from_producer(producer));
        let serializer =
            AvroSerializer::new(SchemaHandle::parse(3, "youtube_videos-value", 1, SCHEMA).unwrap())
                .unwrap();
        let publisher = Publisher::new(sink, serializer);

        publisher.publish("youtube_videos", "abc", &record()).unwrap();
        let report = publisher.flush(Duration::from_secs(10)).await.unwrap();

        assert_eq!(report.delivered + report.failed, 1);
        assert_eq!(publisher.outstanding(), 0);
    }
}

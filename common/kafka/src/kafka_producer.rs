use std::time::Duration;

use metrics::gauge;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, Producer};
use rdkafka::ClientConfig;
use tracing::{debug, error, info};

use crate::config::KafkaConfig;

pub struct KafkaContext;

impl rdkafka::ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("kafka_producer_queue_bytes").set(stats.msg_size as f64);
        gauge!("kafka_callback_queue_depth").set(stats.replyq as f64);

        for (_, broker) in stats.brokers {
            gauge!(
                "kafka_broker_requests_pending",
                "broker" => broker.nodeid.to_string()
            )
            .set(broker.outbuf_cnt as f64);
        }
    }
}

pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_hosts)
        .set("statistics.interval.ms", "10000")
        .set("linger.ms", config.kafka_producer_linger_ms.to_string())
        .set(
            "message.timeout.ms",
            config.kafka_message_timeout_ms.to_string(),
        )
        .set(
            "compression.codec",
            config.kafka_compression_codec.to_owned(),
        )
        .set(
            "queue.buffering.max.kbytes",
            (config.kafka_producer_queue_mib * 1024).to_string(),
        )
        .set(
            "queue.buffering.max.messages",
            config.kafka_producer_queue_messages.to_string(),
        );

    if config.uses_sasl() {
        let protocol = if config.kafka_tls {
            "sasl_ssl"
        } else {
            "sasl_plaintext"
        };
        client_config
            .set("security.protocol", protocol)
            .set("sasl.mechanisms", "PLAIN")
            .set("sasl.username", &config.kafka_sasl_username)
            .set("sasl.password", &config.kafka_sasl_password);
    } else if config.kafka_tls {
        client_config
            .set("security.protocol", "ssl")
            .set("enable.ssl.certificate.verification", "false");
    };

    client_config
}

pub fn create_kafka_producer(
    config: &KafkaConfig,
) -> Result<FutureProducer<KafkaContext>, KafkaError> {
    let client_config = client_config(config);
    debug!("rdkafka configuration: {:?}", config);
    let api: FutureProducer<KafkaContext> = client_config.create_with_context(KafkaContext)?;

    // "Ping" the Kafka brokers by requesting metadata
    match api.client().fetch_metadata(None, Duration::from_secs(15)) {
        Ok(metadata) => {
            info!(
                "Successfully connected to Kafka brokers. Found {} topics.",
                metadata.topics().len()
            );
        }
        Err(error) => {
            error!("Failed to fetch metadata from Kafka brokers: {:?}", error);
            return Err(error);
        }
    }

    Ok(api)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use envconfig::Envconfig;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> KafkaConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        KafkaConfig::init_from_hashmap(&vars).unwrap()
    }

    #[test]
    fn plaintext_by_default() {
        let client_config = client_config(&config_from(&[]));
        assert_eq!(client_config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(client_config.get("security.protocol"), None);
        assert_eq!(client_config.get("queue.buffering.max.kbytes"), Some("409600"));
    }

    #[test]
    fn sasl_over_tls() {
        let client_config = client_config(&config_from(&[
            ("KAFKA_TLS", "true"),
            ("KAFKA_SASL_USERNAME", "svc"),
            ("KAFKA_SASL_PASSWORD", "secret"),
        ]));
        assert_eq!(client_config.get("security.protocol"), Some("sasl_ssl"));
        assert_eq!(client_config.get("sasl.mechanisms"), Some("PLAIN"));
        assert_eq!(client_config.get("sasl.username"), Some("svc"));
    }

    #[test]
    fn tls_without_sasl() {
        let client_config = client_config(&config_from(&[("KAFKA_TLS", "true")]));
        assert_eq!(client_config.get("security.protocol"), Some("ssl"));
        assert_eq!(client_config.get("sasl.mechanisms"), None);
    }
}

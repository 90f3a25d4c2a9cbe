use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "100000")]
    pub kafka_producer_queue_messages: u32, // Maximum number of messages in the in-memory producer queue

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    // Both empty means no SASL. Confluent Cloud clusters want PLAIN over SSL.
    #[envconfig(default = "")]
    pub kafka_sasl_username: String,

    #[envconfig(default = "")]
    pub kafka_sasl_password: String,
}

impl KafkaConfig {
    pub fn uses_sasl(&self) -> bool {
        !self.kafka_sasl_username.is_empty()
    }
}

impl std::fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("kafka_hosts", &self.kafka_hosts)
            .field("kafka_tls", &self.kafka_tls)
            .field("kafka_sasl_username", &self.kafka_sasl_username)
            .field("kafka_producer_linger_ms", &self.kafka_producer_linger_ms)
            .field("kafka_message_timeout_ms", &self.kafka_message_timeout_ms)
            .field("kafka_compression_codec", &self.kafka_compression_codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_have_no_sasl() {
        let config = KafkaConfig::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.kafka_hosts, "localhost:9092");
        assert!(!config.kafka_tls);
        assert!(!config.uses_sasl());
    }

    #[test]
    fn debug_output_hides_password() {
        let vars = HashMap::from([
            ("KAFKA_SASL_USERNAME".to_string(), "svc".to_string()),
            ("KAFKA_SASL_PASSWORD".to_string(), "hunter2".to_string()),
        ]);
        let config = KafkaConfig::init_from_hashmap(&vars).unwrap();
        assert!(config.uses_sasl());
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

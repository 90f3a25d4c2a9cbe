use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;

use super::{DeliveryAck, MessageSink};
use crate::error::{DeliveryError, PublishError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub enum AckMode {
    Succeed,
    After(Duration),
    Never,
}

/// Keeps every message in memory and acknowledges according to `AckMode`.
pub struct MemorySink {
    mode: AckMode,
    failing_keys: HashSet<String>,
    reject_sends: bool,
    messages: Mutex<Vec<SentMessage>>,
}

impl MemorySink {
    pub fn new(mode: AckMode) -> Self {
        Self {
            mode,
            failing_keys: HashSet::new(),
            reject_sends: false,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Messages with this key are accepted but their delivery fails.
    pub fn fail_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Every send fails as if the local queue were full.
    pub fn reject_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessageSink for MemorySink {
    fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<DeliveryAck, PublishError> {
        if self.reject_sends {
            return Err(PublishError::Enqueue(KafkaError::MessageProduction(
                RDKafkaErrorCode::QueueFull,
            )));
        }

        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                payload,
            });

        let result = if self.failing_keys.contains(key) {
            Err(DeliveryError::Broker(KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageSizeTooLarge,
            )))
        } else {
            Ok(())
        };

        Ok(match self.mode {
            AckMode::Succeed => futures::future::ready(result).boxed(),
            AckMode::After(delay) => async move {
                tokio::time::sleep(delay).await;
                result
            }
            .boxed(),
            AckMode::Never => futures::future::pending::<Result<(), DeliveryError>>().boxed(),
        })
    }

    fn flush(&self, _timeout: Duration) -> Result<(), PublishError> {
        Ok(())
    }
}

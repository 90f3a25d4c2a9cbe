use rdkafka::error::KafkaError;
use thiserror::Error;

/// Failure to fetch or decode one page. Any of these aborts the traversal it occurred in.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

impl FetchError {
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("detail record is missing mandatory field {field}")]
    MissingField { field: &'static str },
    #[error("statistic {field} has non-numeric value {value}")]
    MalformedStatistic { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema registry request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("schema registry returned {status} for subject {subject}")]
    Status {
        subject: String,
        status: reqwest::StatusCode,
    },
    #[error("subject {subject} has unsupported schema type {schema_type}")]
    UnsupportedType {
        subject: String,
        schema_type: String,
    },
    #[error("failed to parse schema: {0}")]
    Parse(#[from] apache_avro::Error),
}

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("value schema must be a record, got {0}")]
    NotARecord(String),
    #[error("schema field {field} has no value and is not nullable")]
    UnmappedField { field: String },
    #[error("cannot encode {field} as {schema}")]
    IncompatibleField { field: String, schema: String },
    #[error("value {value} for {field} does not fit in an avro int")]
    OutOfRange { field: String, value: u64 },
    #[error("avro encoding failed: {0}")]
    Avro(#[from] apache_avro::Error),
}

/// Reported asynchronously through the delivery callback, never by `publish` itself.
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("broker rejected message: {0}")]
    Broker(#[from] KafkaError),
    #[error("delivery canceled before acknowledgement")]
    Canceled,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("failed to enqueue message: {0}")]
    Enqueue(#[source] KafkaError),
    #[error("flush failed: {0}")]
    Flush(#[source] KafkaError),
    #[error("flush task failed: {0}")]
    FlushTask(#[from] tokio::task::JoinError),
    #[error("flush timed out with {outstanding} messages unacknowledged")]
    FlushTimeout { outstanding: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to normalize video {detail_id}: {source}")]
    Normalize {
        detail_id: String,
        #[source]
        source: NormalizeError,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
}

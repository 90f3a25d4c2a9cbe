use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use metrics::counter;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::{DeliveryError, PublishError};
use crate::normalize::NormalizedRecord;

pub mod avro;
pub mod kafka;
pub mod memory;

use avro::AvroSerializer;

/// Resolves once the broker has acknowledged (or given up on) one message.
pub type DeliveryAck = BoxFuture<'static, Result<(), DeliveryError>>;

/// The broker capability the publisher writes through.
pub trait MessageSink: Send + Sync {
    /// Enqueue one message. Only local failures (a full queue) are reported here,
    /// broker failures come back through the returned ack.
    fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<DeliveryAck, PublishError>;

    /// Block until everything enqueued so far has left the local queue.
    fn flush(&self, timeout: Duration) -> Result<(), PublishError>;
}

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub topic: String,
    pub key: String,
    pub record: NormalizedRecord,
    pub error: Option<DeliveryError>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub type DeliveryCallback = Arc<dyn Fn(&DeliveryOutcome) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Default)]
struct DeliveryStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicUsize,
    settled: Notify,
}

impl DeliveryStats {
    fn record(&self, outcome: &DeliveryOutcome) {
        match &outcome.error {
            None => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                counter!("youtube_watcher_deliveries_total", "outcome" => "success").increment(1);
                debug!(topic = %outcome.topic, key = %outcome.key, "record delivered");
            }
            Some(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                counter!("youtube_watcher_deliveries_total", "outcome" => "failure").increment(1);
                error!(topic = %outcome.topic, key = %outcome.key, "failed to deliver record: {}", err);
            }
        }
    }

    // Called once the outcome is recorded and the callback has run
    fn settle(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.settled.notify_waiters();
    }

    fn report(&self) -> FlushReport {
        FlushReport {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializes records and hands them to a sink without waiting for the broker.
///
/// Every accepted record gets a task awaiting its acknowledgement; that task records
/// the outcome and runs the delivery callback. `flush` is the barrier that waits for
/// all of them. Safe to share between concurrent callers.
pub struct Publisher {
    sink: Arc<dyn MessageSink>,
    serializer: AvroSerializer,
    pending: Mutex<JoinSet<()>>,
    stats: Arc<DeliveryStats>,
    on_delivery: Option<DeliveryCallback>,
}

impl Publisher {
    pub fn new(sink: Arc<dyn MessageSink>, serializer: AvroSerializer) -> Self {
        Self {
            sink,
            serializer,
            pending: Mutex::new(JoinSet::new()),
            stats: Arc::new(DeliveryStats::default()),
            on_delivery: None,
        }
    }

    pub fn with_delivery_callback(mut self, callback: DeliveryCallback) -> Self {
        self.on_delivery = Some(callback);
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn publish(
        &self,
        topic: &str,
        key: &str,
        record: &NormalizedRecord,
    ) -> Result<(), PublishError> {
        let payload = self.serializer.serialize(record)?;
        let ack = self.sink.send(topic, key, payload)?;
        counter!("youtube_watcher_records_published_total").increment(1);

        let stats = self.stats.clone();
        let callback = self.on_delivery.clone();
        let topic = topic.to_string();
        let key = key.to_string();
        let record = record.clone();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut pending);
        stats.in_flight.fetch_add(1, Ordering::AcqRel);
        pending.spawn(async move {
            let outcome = DeliveryOutcome {
                topic,
                key,
                record,
                error: ack.await.err(),
            };
            stats.record(&outcome);
            if let Some(callback) = callback {
                callback(&outcome);
            }
            stats.settle();
        });
        Ok(())
    }

    /// Records whose delivery outcome has not been recorded yet.
    pub fn outstanding(&self) -> usize {
        self.stats.in_flight.load(Ordering::Acquire)
    }

    /// Wait until every record published so far has had its delivery outcome recorded.
    /// On timeout the acknowledgement tasks keep running, so a later flush waits for them again.
    pub async fn flush(&self, timeout: Duration) -> Result<FlushReport, PublishError> {
        let started = Instant::now();
        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.flush(timeout)).await??;

        let remaining = timeout.saturating_sub(started.elapsed());
        let drained = tokio::time::timeout(remaining, async {
            loop {
                // Registered before the check so a settle in between is not missed
                let mut settled = std::pin::pin!(self.stats.settled.notified());
                settled.as_mut().enable();
                if self.outstanding() == 0 {
                    break;
                }
                settled.await;
            }
        })
        .await;

        reap_finished(&mut self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        if drained.is_err() {
            return Err(PublishError::FlushTimeout {
                outstanding: self.outstanding(),
            });
        }

        let report = self.stats.report();
        info!(
            delivered = report.delivered,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "flushed publisher"
        );
        Ok(report)
    }
}

fn reap_finished(pending: &mut JoinSet<()>) {
    while let Some(result) = pending.try_join_next() {
        if let Err(e) = result {
            error!("delivery task failed: {:?}", e);
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use futures::{future, TryStreamExt};
use metrics::counter;
use tracing::{info, warn};

use crate::config::Config;
use crate::emit::Publisher;
use crate::enrich::{Enricher, EntryReference};
use crate::error::{FetchError, NormalizeError, PipelineError};
use crate::normalize::normalize;
use crate::source::traversal::Traversal;
use crate::source::youtube::YoutubeApi;
use crate::source::{PageFetcher, RawObject};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub playlist_id: String,
    pub topic: String,
    pub enrich_concurrency: usize,
    pub flush_timeout: Duration,
    pub skip_invalid_records: bool,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            playlist_id: config.youtube_playlist_id.clone(),
            topic: config.kafka_topic.clone(),
            enrich_concurrency: config.enrich_concurrency,
            flush_timeout: config.flush_timeout(),
            skip_invalid_records: config.skip_invalid_records,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub entries: u64,
    pub details: u64,
    pub published: u64,
    pub skipped: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// One pass over a playlist: traverse, enrich, normalize, publish, flush.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    api: YoutubeApi,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, api: YoutubeApi, settings: PipelineSettings) -> Self {
        Self {
            fetcher,
            api,
            settings,
        }
    }

    pub async fn run(&self, publisher: &Publisher) -> Result<RunSummary, PipelineError> {
        let request = self.api.playlist_items(&self.settings.playlist_id);
        let endpoint = request.endpoint.clone();
        let enricher = Enricher::new(self.fetcher.clone(), self.api.clone());

        let enriched = Traversal::new(self.fetcher.clone(), request)
            .into_stream()
            .and_then(move |item| future::ready(EntryReference::from_raw(&endpoint, &item)))
            .map_ok(move |entry| {
                let enricher = enricher.clone();
                async move {
                    let details = enricher.enrich_all(&entry.detail_id).await?;
                    Ok::<_, FetchError>((entry, details))
                }
            })
            .try_buffered(self.settings.enrich_concurrency.max(1));
        let mut enriched = std::pin::pin!(enriched);

        let mut summary = RunSummary::default();
        while let Some((entry, details)) = enriched.try_next().await? {
            summary.entries += 1;
            for detail in details {
                summary.details += 1;
                if self.handle_detail(publisher, &entry, &detail)? {
                    summary.published += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }

        let report = publisher.flush(self.settings.flush_timeout).await?;
        summary.delivered = report.delivered;
        summary.failed = report.failed;
        Ok(summary)
    }

    // Ok(false) means the record was skipped
    fn handle_detail(
        &self,
        publisher: &Publisher,
        entry: &EntryReference,
        detail: &RawObject,
    ) -> Result<bool, PipelineError> {
        let record = match normalize(detail) {
            Ok(record) => record,
            Err(NormalizeError::MissingField { field }) if self.settings.skip_invalid_records => {
                warn!(
                    video_id = %entry.detail_id,
                    field, "skipping video with missing field"
                );
                counter!("youtube_watcher_records_skipped_total").increment(1);
                return Ok(false);
            }
            Err(source) => {
                return Err(PipelineError::Normalize {
                    detail_id: entry.detail_id.clone(),
                    source,
                })
            }
        };

        info!(
            video_id = %record.id,
            title = %record.title,
            views = record.view_count,
            likes = record.like_count,
            comments = record.comment_count,
            "video"
        );
        publisher.publish(&self.settings.topic, &entry.detail_id, &record)?;
        Ok(true)
    }
}

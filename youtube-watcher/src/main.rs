use std::sync::Arc;

use anyhow::{bail, Context, Error};
use envconfig::Envconfig;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use youtube_watcher::{
    config::{Config, LogFormat},
    emit::{avro::AvroSerializer, kafka::KafkaSink, Publisher},
    pipeline::{Pipeline, PipelineSettings},
    schema::{value_subject, SchemaRegistryClient},
    source::{http::HttpPageFetcher, youtube::YoutubeApi},
};

fn setup_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed(),
    };
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::init_from_env().context("failed to load configuration")?;
    setup_tracing(config.log_format);
    info!(playlist_id = %config.youtube_playlist_id, topic = %config.kafka_topic, "starting youtube watcher");

    let registry = SchemaRegistryClient::new(
        &config.schema_registry_url,
        config.schema_registry_credentials(),
    )?;
    let handle = registry
        .resolve_schema(&value_subject(&config.kafka_topic))
        .await
        .context("failed to resolve value schema")?;
    let serializer = AvroSerializer::new(handle)?;

    let sink = KafkaSink::new(&config.kafka).context("failed to create kafka producer")?;
    let publisher = Publisher::new(Arc::new(sink), serializer);

    let fetcher = Arc::new(HttpPageFetcher::new()?);
    let pipeline = Pipeline::new(
        fetcher,
        YoutubeApi::from_config(&config),
        PipelineSettings::from(&config),
    );

    let summary = match pipeline.run(&publisher).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("pipeline run failed: {}", e);
            return Err(e.into());
        }
    };

    info!(
        entries = summary.entries,
        details = summary.details,
        published = summary.published,
        skipped = summary.skipped,
        delivered = summary.delivered,
        failed = summary.failed,
        "run complete"
    );

    if summary.failed > 0 {
        bail!("{} of {} records failed delivery", summary.failed, summary.published);
    }
    Ok(())
}

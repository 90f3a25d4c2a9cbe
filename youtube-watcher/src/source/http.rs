use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use tracing::debug;

use super::{decode_page, Page, PageFetcher, PageRequest};
use crate::error::FetchError;

pub const CURSOR_PARAM: &str = "pageToken";

/// Fetches pages over HTTP. No retries and no request timeout: a hanging upstream stalls the caller.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("youtube-watcher/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        cursor: Option<&str>,
    ) -> Result<Page, FetchError> {
        let network = |source| FetchError::Network {
            endpoint: request.endpoint.clone(),
            source,
        };

        let mut builder = self.client.get(&request.endpoint).query(&request.params);
        if let Some(cursor) = cursor {
            builder = builder.query(&[(CURSOR_PARAM, cursor)]);
        }

        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        let body = response.bytes().await.map_err(network)?;

        let page = decode_page(&request.endpoint, &body)?;
        counter!("youtube_watcher_pages_fetched_total").increment(1);
        debug!(
            endpoint = %request.endpoint,
            items = page.items.len(),
            has_next = page.next_cursor.is_some(),
            "fetched page"
        );
        Ok(page)
    }
}

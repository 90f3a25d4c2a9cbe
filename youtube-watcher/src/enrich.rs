use std::sync::Arc;

use futures::{Stream, TryStreamExt};
use tracing::debug;

use crate::error::FetchError;
use crate::source::traversal::Traversal;
use crate::source::youtube::YoutubeApi;
use crate::source::{PageFetcher, RawObject};

/// A playlist member, pointing at the video that holds its details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReference {
    pub detail_id: String,
}

impl EntryReference {
    pub fn from_raw(endpoint: &str, item: &RawObject) -> Result<Self, FetchError> {
        item.get("contentDetails")
            .and_then(|details| details.get("videoId"))
            .and_then(|id| id.as_str())
            .map(|id| EntryReference {
                detail_id: id.to_string(),
            })
            .ok_or_else(|| FetchError::malformed(endpoint, "playlist item without contentDetails.videoId"))
    }
}

/// Looks up the detail objects for entry ids. Each call runs its own traversal, so
/// calls for different ids share nothing and may run concurrently.
#[derive(Clone)]
pub struct Enricher {
    fetcher: Arc<dyn PageFetcher>,
    api: YoutubeApi,
}

impl Enricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, api: YoutubeApi) -> Self {
        Self { fetcher, api }
    }

    pub fn enrich(&self, detail_id: &str) -> impl Stream<Item = Result<RawObject, FetchError>> + Send {
        Traversal::new(self.fetcher.clone(), self.api.videos(detail_id)).into_stream()
    }

    pub async fn enrich_all(&self, detail_id: &str) -> Result<Vec<RawObject>, FetchError> {
        let details: Vec<RawObject> = self.enrich(detail_id).try_collect().await?;
        if details.is_empty() {
            debug!(video_id = detail_id, "no details found, skipping");
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::source::memory::InMemoryFetcher;

    fn setup() -> (Arc<InMemoryFetcher>, YoutubeApi, Enricher) {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let api = YoutubeApi::new("https://yt.test/v3", "k", 50);
        let enricher = Enricher::new(fetcher.clone(), api.clone());
        (fetcher, api, enricher)
    }

    #[test]
    fn entry_reference_from_playlist_item() {
        let item = json!({
            "kind": "youtube#playlistItem",
            "contentDetails": { "videoId": "abc", "videoPublishedAt": "2023-01-01T00:00:00Z" }
        });
        let entry = EntryReference::from_raw("/playlistItems", &item).unwrap();
        assert_eq!(entry.detail_id, "abc");
    }

    #[test]
    fn entry_reference_requires_video_id() {
        for item in [json!({}), json!({ "contentDetails": {} }), json!({ "contentDetails": { "videoId": 5 } })] {
            assert!(matches!(
                EntryReference::from_raw("/playlistItems", &item),
                Err(FetchError::MalformedResponse { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_single_detail() {
        let (fetcher, api, enricher) = setup();
        fetcher.add_pages(&api.videos("abc"), vec![vec![json!({ "id": "abc" })]]);

        let details = enricher.enrich_all("abc").await.unwrap();
        assert_eq!(details, vec![json!({ "id": "abc" })]);

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.get("id"), Some("abc"));
    }

    #[tokio::test]
    async fn test_unknown_id_yields_nothing() {
        let (fetcher, _api, enricher) = setup();

        let details = enricher.enrich_all("missing").await.unwrap();
        assert!(details.is_empty());
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_details_across_pages() {
        let (fetcher, api, enricher) = setup();
        fetcher.add_pages(
            &api.videos("abc"),
            vec![vec![json!({ "id": "abc", "n": 1 })], vec![json!({ "id": "abc", "n": 2 })]],
        );

        let details: Vec<RawObject> = enricher
            .enrich("abc")
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(details.len(), 2);
        assert_eq!(details[1]["n"], 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let (fetcher, api, enricher) = setup();
        fetcher.fail_at(&api.videos("abc"), None);

        assert!(enricher.enrich_all("abc").await.is_err());
    }
}

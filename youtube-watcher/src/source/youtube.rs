use super::PageRequest;
use crate::config::Config;

/// Builds the two paginated queries the watcher issues against the YouTube Data API.
#[derive(Clone)]
pub struct YoutubeApi {
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl YoutubeApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, page_size: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            page_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.youtube_api_url,
            &config.google_api_key,
            config.youtube_page_size,
        )
    }

    /// Collection endpoint: playlist membership, one item per video.
    pub fn playlist_items(&self, playlist_id: &str) -> PageRequest {
        PageRequest::new(format!("{}/playlistItems", self.base_url))
            .param("key", &self.api_key)
            .param("playlistId", playlist_id)
            .param("part", "contentDetails")
            .param("maxResults", self.page_size.to_string())
    }

    /// Detail endpoint, filtered to a single video id.
    pub fn videos(&self, video_id: &str) -> PageRequest {
        PageRequest::new(format!("{}/videos", self.base_url))
            .param("key", &self.api_key)
            .param("id", video_id)
            .param("part", "snippet,statistics")
            .param("maxResults", self.page_size.to_string())
    }
}

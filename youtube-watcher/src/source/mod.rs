use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;

pub mod http;
pub mod memory;
pub mod traversal;
pub mod youtube;

pub type RawObject = Value;

/// One decoded page of a paginated listing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Page {
    pub items: Vec<RawObject>,
    // A null token is treated the same as an absent one
    #[serde(rename = "nextPageToken", default)]
    pub next_cursor: Option<String>,
}

/// A single logical query: the endpoint plus the parameters every page request carries.
/// The cursor is not part of the request, it is supplied per page.
#[derive(Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// The API key travels as a query parameter, keep it out of logs
impl std::fmt::Debug for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| {
                if k == "key" {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("PageRequest")
            .field("endpoint", &self.endpoint)
            .field("params", &params)
            .finish()
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        cursor: Option<&str>,
    ) -> Result<Page, FetchError>;
}

/// Decode a response body into a page. The body must be a JSON object with an `items` array.
pub fn decode_page(endpoint: &str, body: &[u8]) -> Result<Page, FetchError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| FetchError::malformed(endpoint, format!("body is not JSON: {e}")))?;

    if !value.is_object() {
        return Err(FetchError::malformed(endpoint, "body is not a JSON object"));
    }
    if !value.get("items").is_some_and(Value::is_array) {
        return Err(FetchError::malformed(endpoint, "missing items array"));
    }

    serde_json::from_value(value).map_err(|e| FetchError::malformed(endpoint, e.to_string()))
}

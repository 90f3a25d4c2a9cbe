use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{Page, PageFetcher, PageRequest, RawObject};
use crate::error::FetchError;

type PageKey = (String, Option<String>);

/// Serves canned pages, keyed by query and cursor, and records every call.
/// Queries with nothing registered answer with an empty last page, which is what
/// the API returns for unknown ids.
#[derive(Default)]
pub struct InMemoryFetcher {
    pages: Mutex<HashMap<PageKey, Result<Page, String>>>,
    calls: Mutex<Vec<(PageRequest, Option<String>)>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn query_key(request: &PageRequest) -> String {
        let mut params: Vec<String> = request
            .params
            .iter()
            .filter(|(k, _)| k != "key")
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        params.sort();
        format!("{}?{}", request.endpoint, params.join("&"))
    }

    pub fn add_page(
        &self,
        request: &PageRequest,
        cursor: Option<&str>,
        items: Vec<RawObject>,
        next_cursor: Option<String>,
    ) {
        let key = (Self::query_key(request), cursor.map(str::to_string));
        let page = Page { items, next_cursor };
        self.pages.lock().unwrap_or_else(PoisonError::into_inner).insert(key, Ok(page));
    }

    /// Registers a chain of pages linked by cursors `page-2`, `page-3`, ...
    pub fn add_pages(&self, request: &PageRequest, pages: Vec<Vec<RawObject>>) {
        let total = pages.len();
        for (index, items) in pages.into_iter().enumerate() {
            let cursor = (index > 0).then(|| format!("page-{}", index + 1));
            let next = (index + 1 < total).then(|| format!("page-{}", index + 2));
            self.add_page(request, cursor.as_deref(), items, next);
        }
    }

    pub fn fail_at(&self, request: &PageRequest, cursor: Option<&str>) {
        let key = (Self::query_key(request), cursor.map(str::to_string));
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Err("injected failure".to_string()));
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn calls(&self) -> Vec<(PageRequest, Option<String>)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl PageFetcher for InMemoryFetcher {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        cursor: Option<&str>,
    ) -> Result<Page, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((request.clone(), cursor.map(str::to_string)));

        let key = (Self::query_key(request), cursor.map(str::to_string));
        match self.pages.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(reason)) => Err(FetchError::malformed(&request.endpoint, reason.clone())),
            None => Ok(Page::default()),
        }
    }
}

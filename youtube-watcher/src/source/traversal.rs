use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;

use super::{PageFetcher, PageRequest, RawObject};
use crate::error::FetchError;

enum Cursor {
    Initial,
    Next(String),
    Exhausted,
}

/// Walks every page of one query, yielding items in page order.
///
/// Pages are fetched one at a time and only when the buffered items of the previous
/// page have been consumed, so a caller that stops early never triggers another request.
/// Iteration ends when a page comes back without a next cursor, or after the first error.
pub struct Traversal {
    fetcher: Arc<dyn PageFetcher>,
    request: PageRequest,
    cursor: Cursor,
    buffered: VecDeque<RawObject>,
    fetches: usize,
}

impl Traversal {
    pub fn new(fetcher: Arc<dyn PageFetcher>, request: PageRequest) -> Self {
        Self {
            fetcher,
            request,
            cursor: Cursor::Initial,
            buffered: VecDeque::new(),
            fetches: 0,
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    pub async fn next_item(&mut self) -> Result<Option<RawObject>, FetchError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }

            // Exhausted until the fetch succeeds, so an error ends the traversal
            let cursor = match std::mem::replace(&mut self.cursor, Cursor::Exhausted) {
                Cursor::Exhausted => return Ok(None),
                Cursor::Initial => None,
                Cursor::Next(token) => Some(token),
            };

            self.fetches += 1;
            let page = self
                .fetcher
                .fetch_page(&self.request, cursor.as_deref())
                .await?;

            self.buffered.extend(page.items);
            if let Some(next) = page.next_cursor {
                self.cursor = Cursor::Next(next);
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<RawObject, FetchError>> + Send {
        futures::stream::try_unfold(self, |mut traversal| async move {
            Ok(traversal
                .next_item()
                .await?
                .map(|item| (item, traversal)))
        })
    }
}

//! Walks a paged JSON collection into a single ordered item list.
//!
//! Stop conditions are checked after each non-empty page, in this order:
//! 1. the configured item limit has been reached,
//! 2. the server sent an explicit has-more flag set to `false`,
//! 3. the page held fewer items than requested (short page).
//!
//! A failed fetch or an empty/missing item list also ends the walk. Neither
//! is an error; the items gathered so far are returned.
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetch::Fetch;

/// Query-parameter convention of a paged endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    /// `?page=N&per_page=P`, pages numbered from 1.
    PageNumber,
    /// `?limit=P&offset=N`, offsets starting at 0.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Page(usize),
    Offset(usize),
}

impl Cursor {
    pub fn start(style: PageStyle) -> Self {
        match style {
            PageStyle::PageNumber => Cursor::Page(1),
            PageStyle::Offset => Cursor::Offset(0),
        }
    }

    pub fn advance(self, page_size: usize) -> Self {
        match self {
            Cursor::Page(page) => Cursor::Page(page + 1),
            Cursor::Offset(offset) => Cursor::Offset(offset + page_size),
        }
    }
}

/// One page fetch, rendered to a URL per iteration.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub base_url: &'a Url,
    pub path: &'a str,
    pub cursor: Cursor,
    pub page_size: usize,
}

impl PageRequest<'_> {
    pub fn url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(self.path);
        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            match self.cursor {
                Cursor::Page(page) => {
                    pairs
                        .append_pair("page", &page.to_string())
                        .append_pair("per_page", &self.page_size.to_string());
                }
                Cursor::Offset(offset) => {
                    pairs
                        .append_pair("limit", &self.page_size.to_string())
                        .append_pair("offset", &offset.to_string());
                }
            }
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FetchFailed,
    EmptyPage,
    LimitReached,
    NoMore,
    ShortPage,
}

/// Outcome of a pagination walk.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWalk {
    pub items: Vec<Value>,
    pub fetches: usize,
    pub stop: StopReason,
}

pub struct Paginator<'a> {
    fetcher: &'a dyn Fetch,
    base_url: &'a Url,
    path: &'a str,
    items_key: &'a str,
    style: PageStyle,
    page_size: usize,
    limit: Option<usize>,
    has_more_key: Option<&'a str>,
    delay: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        base_url: &'a Url,
        path: &'a str,
        items_key: &'a str,
        style: PageStyle,
        page_size: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            path,
            items_key,
            style,
            page_size: page_size.max(1),
            limit: None,
            has_more_key: None,
            delay: Duration::ZERO,
        }
    }

    /// Stop once at least `limit` items are held. Items are not truncated.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Honour a boolean "more pages follow" field in each page body.
    pub fn has_more_key(mut self, key: &'a str) -> Self {
        self.has_more_key = Some(key);
        self
    }

    /// Pause between successive page fetches.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn walk(&self) -> PageWalk {
        let mut items: Vec<Value> = Vec::new();
        let mut cursor = Cursor::start(self.style);
        let mut fetches = 0;

        let stop = loop {
            let request = PageRequest {
                base_url: self.base_url,
                path: self.path,
                cursor,
                page_size: self.page_size,
            };
            let url = request.url();
            fetches += 1;

            let Some(page) = self.fetcher.fetch_json(url.as_str()).await else {
                break StopReason::FetchFailed;
            };
            let page_items = match page.get(self.items_key).and_then(Value::as_array) {
                Some(list) if !list.is_empty() => list,
                _ => {
                    debug!(url = %url, "empty page");
                    break StopReason::EmptyPage;
                }
            };

            let count = page_items.len();
            items.extend(page_items.iter().cloned());
            info!(
                collection = self.items_key,
                ?cursor,
                count,
                total = items.len(),
                "fetched page"
            );

            if self.limit.is_some_and(|limit| items.len() >= limit) {
                break StopReason::LimitReached;
            }
            if let Some(key) = self.has_more_key {
                if page.get(key).and_then(Value::as_bool) == Some(false) {
                    break StopReason::NoMore;
                }
            }
            if count < self.page_size {
                break StopReason::ShortPage;
            }

            cursor = cursor.advance(self.page_size);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        };

        PageWalk {
            items,
            fetches,
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_request_url() {
        let base = Url::parse("https://molt.church").unwrap();
        let request = PageRequest {
            base_url: &base,
            path: "/api/canon",
            cursor: Cursor::Page(3),
            page_size: 50,
        };
        assert_eq!(
            request.url().as_str(),
            "https://molt.church/api/canon?page=3&per_page=50"
        );
    }

    #[test]
    fn offset_request_url() {
        let base = Url::parse("https://www.moltbook.com/").unwrap();
        let request = PageRequest {
            base_url: &base,
            path: "/api/v1/posts",
            cursor: Cursor::Offset(100),
            page_size: 50,
        };
        assert_eq!(
            request.url().as_str(),
            "https://www.moltbook.com/api/v1/posts?limit=50&offset=100"
        );
    }

    #[test]
    fn cursor_advances_by_style() {
        assert_eq!(Cursor::start(PageStyle::PageNumber), Cursor::Page(1));
        assert_eq!(Cursor::Page(1).advance(50), Cursor::Page(2));
        assert_eq!(Cursor::start(PageStyle::Offset), Cursor::Offset(0));
        assert_eq!(Cursor::Offset(0).advance(100).advance(100), Cursor::Offset(200));
    }
}

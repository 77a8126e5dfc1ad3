//! Continuation-link pagination.
//!
//! DSIS pages carry their rows under `value` and, while more rows remain, a
//! relative `odata.nextLink` such as `Well?$skiptoken=...`. The link replaces
//! the last segment of the original endpoint as-is; query options are not
//! re-attached because the link already encodes them.

use std::num::NonZeroUsize;

use futures::Stream;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gateway::RequestGateway;
use crate::model::{cast_items, DsisModel};

/// One row of a result set.
pub type Item = Map<String, Value>;

/// One fetched response page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    /// Rows of this page.
    #[serde(default)]
    pub value: Vec<Item>,

    /// Continuation link; absent or empty on the last page.
    #[serde(rename = "odata.nextLink", alias = "@odata.nextLink", default)]
    pub next_link: Option<String>,

    /// Every other top-level key, e.g. `odata.metadata`.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Page {
    /// Interpret a JSON response body as a page.
    pub fn from_json(body: Value) -> Result<Self> {
        let mut page: Page = serde_json::from_value(body)?;
        page.next_link = continuation(page.next_link);
        Ok(page)
    }
}

fn continuation(link: Option<String>) -> Option<String> {
    link.filter(|l| !l.trim().is_empty())
}

/// Upper bound on the number of pages fetched in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageBound {
    /// Follow links until none remain.
    #[default]
    Unbounded,
    /// Fetch at most this many pages, counting the first.
    Pages(NonZeroUsize),
}

impl PageBound {
    /// Bound to `n` pages. Zero is rejected.
    pub fn pages(n: usize) -> Result<Self> {
        NonZeroUsize::new(n)
            .map(PageBound::Pages)
            .ok_or_else(|| Error::invalid_query("page bound must be at least 1"))
    }

    /// Only the first page.
    pub fn first_page() -> Self {
        PageBound::Pages(NonZeroUsize::MIN)
    }

    /// Returns true if another page may be fetched after `fetched` pages.
    pub fn allows_more(&self, fetched: usize) -> bool {
        match self {
            PageBound::Unbounded => true,
            PageBound::Pages(limit) => fetched < limit.get(),
        }
    }
}

/// Endpoint for a continuation link.
///
/// Relative links replace the final path segment of `endpoint`; absolute
/// links are used unchanged.
pub fn follow_up_endpoint(endpoint: &str, next_link: &str) -> String {
    if next_link.starts_with("http://") || next_link.starts_with("https://") {
        return next_link.to_string();
    }
    match endpoint.rsplit_once('/') {
        Some((base, _)) => format!("{base}/{next_link}"),
        None => next_link.to_string(),
    }
}

/// Every item of a pagination run, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Items of all fetched pages.
    pub items: Vec<Item>,
    /// Metadata of the last fetched page.
    pub metadata: Map<String, Value>,
    /// Number of pages fetched.
    pub pages_fetched: usize,
}

impl QueryResult {
    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items were returned.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cast every item to `T`, failing on the first bad item.
    pub fn cast<T: DsisModel>(&self) -> Result<Vec<T>> {
        cast_items(&self.items)
    }
}

/// Lazy item sequence over a chain of pages.
///
/// The next page is requested only when the current one is used up, so
/// dropping the stream early saves the remaining requests.
#[derive(Debug)]
pub struct PageStream<'a> {
    gateway: &'a mut RequestGateway,
    endpoint: String,
    bound: PageBound,
    items: std::vec::IntoIter<Item>,
    next_link: Option<String>,
    metadata: Map<String, Value>,
    pages_fetched: usize,
}

impl<'a> PageStream<'a> {
    /// Start from an already fetched first page of `endpoint`.
    pub fn new(gateway: &'a mut RequestGateway, endpoint: impl Into<String>, first: Page, bound: PageBound) -> Self {
        Self {
            gateway,
            endpoint: endpoint.into(),
            bound,
            items: first.value.into_iter(),
            next_link: continuation(first.next_link),
            metadata: first.metadata,
            pages_fetched: 1,
        }
    }

    /// Pages fetched so far, including the first.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Metadata of the most recently fetched page.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns true if a further page would be requested once the current
    /// items run out.
    pub fn has_more_pages(&self) -> bool {
        self.next_link.is_some() && self.bound.allows_more(self.pages_fetched)
    }

    /// Next item, fetching the next page when the current one is exhausted.
    pub async fn next_item(&mut self) -> Result<Option<Item>> {
        loop {
            if let Some(item) = self.items.next() {
                return Ok(Some(item));
            }

            if !self.has_more_pages() {
                return Ok(None);
            }
            let Some(link) = self.next_link.take() else {
                return Ok(None);
            };

            let endpoint = follow_up_endpoint(&self.endpoint, &link);
            debug!(page = self.pages_fetched + 1, endpoint = %endpoint, "Fetching next page");

            let body = self.gateway.request_json(&endpoint, None).await?;
            let page = Page::from_json(body)?;

            self.pages_fetched += 1;
            self.items = page.value.into_iter();
            self.next_link = page.next_link;
            self.metadata = page.metadata;
        }
    }

    /// Drain every permitted page.
    pub async fn collect_all(mut self) -> Result<QueryResult> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        info!(
            items = items.len(),
            pages = self.pages_fetched,
            "Query complete"
        );
        Ok(QueryResult {
            items,
            metadata: self.metadata,
            pages_fetched: self.pages_fetched,
        })
    }

    /// Adapt into a [`Stream`] of items.
    pub fn into_stream(self) -> impl Stream<Item = Result<Item>> + 'a {
        futures::stream::try_unfold(self, |mut stream| async move {
            Ok(stream.next_item().await?.map(|item| (item, stream)))
        })
    }
}

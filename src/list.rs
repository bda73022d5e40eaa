use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page selection for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Results per page.
    pub size: u32,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListRequest {
    /// A size of zero falls back to the default of 20.
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.filter(|&s| s > 0).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// The request for the page after this one, or `None` past the last
    /// representable page.
    pub fn next(&self) -> Option<Self> {
        Some(Self {
            page: self.page.checked_add(1)?,
            size: self.size,
        })
    }

    /// Whether `count` results extend past the pages up to and including this
    /// one.
    fn covers_less_than(&self, count: u64) -> bool {
        match self.page.checked_add(1) {
            Some(pages) if self.size > 0 => u64::from(pages) * u64::from(self.size) < count,
            _ => false,
        }
    }

    pub(crate) fn query(&self) -> [(&'static str, String); 2] {
        [("page", self.page.to_string()), ("size", self.size.to_string())]
    }
}

/// One page of a list endpoint's results.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default)]
    pub content: Vec<T>,
    /// Page index.
    pub page: u32,
    /// Page size.
    pub length: u32,
    /// Total number of results across all pages.
    pub count: u64,
}

impl<T> ListResponse<T> {
    /// Whether pages after this one hold further results.
    pub fn has_next(&self) -> bool {
        !self.content.is_empty()
            && ListRequest {
                page: self.page,
                size: self.length,
            }
            .covers_less_than(self.count)
    }
}

/// Iterator over every item of a list endpoint, fetching pages on demand.
///
/// Created by [`Client::datasets`](crate::Client::datasets) and its order and
/// campaign counterparts. Iteration stops after the last page or at the first
/// error.
pub(crate) struct Pages<T, F> {
    fetch: F,
    next: Option<ListRequest>,
    buffer: VecDeque<T>,
}

impl<T, F> Pages<T, F>
where
    F: FnMut(ListRequest) -> Result<ListResponse<T>>,
{
    pub(crate) fn new(start: ListRequest, fetch: F) -> Self {
        Self {
            fetch,
            next: Some(start),
            buffer: VecDeque::new(),
        }
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(ListRequest) -> Result<ListResponse<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let req = self.next.take()?;
            match (self.fetch)(req) {
                Ok(page) => {
                    // The server's page numbers aren't trusted; walk from what
                    // was requested.
                    let more = !page.content.is_empty()
                        && page.length > 0
                        && req.covers_less_than(page.count);
                    if more {
                        self.next = req.next();
                    }
                    self.buffer.extend(page.content);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

//! Offset pagination with explicit caps on page count and elapsed time.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::application::repos::RepoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PagerLimits {
    pub page_size: NonZeroU32,
    pub max_pages: NonZeroU32,
    pub max_duration: Duration,
}

#[derive(Debug, Error)]
pub enum PagerError {
    #[error("page cap reached after {pages} pages ({rows} rows) without exhausting results")]
    PageCap { pages: u32, rows: usize },
    #[error("pagination deadline of {limit:?} exceeded after {elapsed:?}")]
    Deadline { limit: Duration, elapsed: Duration },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Walks an offset-paged result set until a short page is returned.
#[derive(Debug)]
pub struct Pager {
    limits: PagerLimits,
    next_offset: u64,
    pages: u32,
    rows: usize,
    started_at: Instant,
    exhausted: bool,
}

impl Pager {
    pub fn new(limits: PagerLimits) -> Self {
        Self {
            limits,
            next_offset: 0,
            pages: 0,
            rows: 0,
            started_at: Instant::now(),
            exhausted: false,
        }
    }

    /// Next page to fetch, `None` once exhausted, or an error when a cap is hit.
    pub fn next_request(&self) -> Result<Option<PageRequest>, PagerError> {
        if self.exhausted {
            return Ok(None);
        }
        if self.pages >= self.limits.max_pages.get() {
            return Err(PagerError::PageCap {
                pages: self.pages,
                rows: self.rows,
            });
        }
        let elapsed = self.started_at.elapsed();
        if elapsed > self.limits.max_duration {
            return Err(PagerError::Deadline {
                limit: self.limits.max_duration,
                elapsed,
            });
        }
        Ok(Some(PageRequest::new(
            self.limits.page_size.get(),
            self.next_offset,
        )))
    }

    pub fn record(&mut self, fetched: usize) {
        let page_size = self.limits.page_size.get();
        self.pages += 1;
        self.rows += fetched;
        self.next_offset += u64::from(page_size);
        if fetched < page_size as usize {
            self.exhausted = true;
        }
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }
}

/// Fetch every page through `fetch`, stopping at the first short page.
pub async fn collect_pages<T, F, Fut>(limits: PagerLimits, mut fetch: F) -> Result<Vec<T>, PagerError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Vec<T>, RepoError>>,
{
    let mut pager = Pager::new(limits);
    let mut items = Vec::new();

    while let Some(request) = pager.next_request()? {
        let page = fetch(request).await?;
        pager.record(page.len());
        items.extend(page);
    }

    Ok(items)
}

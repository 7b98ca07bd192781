//! Paging for audit log searches.

use serde::Serialize;

use crate::error::AppError;
use crate::result::AppResult;

const DEFAULT_PAGE_SIZE: u64 = 25;
const MAX_PAGE_SIZE: u64 = 500;

/// A 1-based page of at most [`MAX_PAGE_SIZE`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Out-of-range values are clamped rather than rejected.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip, as a SQL `OFFSET`.
    ///
    /// Fails for pages so far out that the offset does not fit an `i64`.
    pub fn offset(&self) -> AppResult<i64> {
        (self.page - 1)
            .checked_mul(self.page_size)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(|| AppError::validation(format!("Page {} is out of range", self.page)))
    }

    /// Rows to fetch.
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    /// Never zero; an empty result is a single empty page.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages: total_items.div_ceil(request.page_size).max(1),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

//! Pagination request and result shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::Bucket;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// A 1-based page request as received from a caller.
///
/// Out-of-range values are normalised rather than rejected: page 0 becomes
/// 1, size 0 becomes [`DEFAULT_PAGE_SIZE`], sizes above [`MAX_PAGE_SIZE`]
/// are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn size(&self) -> usize {
        match self.size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        }
    }

    /// Number of documents before this page.
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.size())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of typed results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    /// Matches across all pages.
    pub total: u64,
    /// `ceil(total / size)`.
    pub pages: u64,
    /// The requested page, as passed by the caller.
    pub current: usize,
    pub size: usize,
    pub records: Vec<T>,
    pub index: String,
}

impl<T> PageResult<T> {
    pub fn new(
        records: Vec<T>,
        total: u64,
        current: usize,
        size: usize,
        index: impl Into<String>,
    ) -> Self {
        let pages = match size {
            0 => 0,
            size => total.div_ceil(size as u64),
        };
        Self {
            total,
            pages,
            current,
            size,
            records,
            index: index.into(),
        }
    }
}

/// Typed search hits with the total match count and group-by buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    pub total: u64,
    pub records: Vec<T>,
    /// Buckets keyed by aggregation name (`group_by_<field>_<n>`).
    pub aggregations: BTreeMap<String, Vec<Bucket>>,
}

impl<T> SearchResult<T> {
    /// Buckets for a group-by field, looked up by its bucket name.
    pub fn buckets(&self, name: &str) -> &[Bucket] {
        self.aggregations.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let request: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PageRequest::default());
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_page_request_normalises() {
        assert_eq!(PageRequest::new(0, 0).page(), 1);
        assert_eq!(PageRequest::new(0, 0).size(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(2, 500).size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let request = PageRequest::new(usize::MAX, 10);
        assert_eq!(request.offset(), usize::MAX);
    }

    #[test]
    fn test_pages_round_up() {
        let page: PageResult<()> = PageResult::new(vec![], 25, 2, 10, "users");
        assert_eq!(page.pages, 3);
        assert_eq!(page.current, 2);

        let exact: PageResult<()> = PageResult::new(vec![], 20, 1, 10, "users");
        assert_eq!(exact.pages, 2);

        let empty: PageResult<()> = PageResult::new(vec![], 0, 1, 10, "users");
        assert_eq!(empty.pages, 0);
    }
}

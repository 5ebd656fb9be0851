//! Paging types matching the backend's page request/response shape.

use serde::{Deserialize, Serialize};

use super::{CategoryId, SortDirection};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Number of items per page.
    pub size: u32,
}

impl PageRequest {
    /// Create a page request.
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// The first page with the given size.
    #[must_use]
    pub const fn first(size: u32) -> Self {
        Self { page: 0, size }
    }
}

/// Product listing filters on top of a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: PageRequest,
    pub category_id: Option<CategoryId>,
    pub query: Option<String>,
    pub sort_by_price: Option<SortDirection>,
}

impl ProductQuery {
    /// Unfiltered listing of the given page.
    #[must_use]
    pub const fn page(page: PageRequest) -> Self {
        Self {
            page,
            category_id: None,
            query: None,
            sort_by_price: None,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    /// Zero-based index of this page.
    pub number: u32,
}

impl<T> Page<T> {
    /// Whether a page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserializes_backend_shape() {
        let json = r#"{"content":[1,2],"totalElements":14,"totalPages":2,"number":0}"#;
        let page: Page<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page.content, vec![1, 2]);
        assert!(page.has_next());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: Page<u32> = Page {
            content: vec![],
            total_elements: 0,
            total_pages: 0,
            number: 0,
        };
        assert!(!page.has_next());
    }
}

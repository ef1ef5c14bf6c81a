//! Page requests and result pages.
//!
//! Pagination itself is the store's job; these types only carry the request
//! down and the slice back up.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned by [`SortDirection::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort direction: {0} (expected ASC or DESC)")]
pub struct SortDirectionError(pub String);

/// Sort order for paged queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse a direction. Accepts `ASC`, `ASCENDING`, `DESC` and `DESCENDING`
    /// in any case; anything else is rejected rather than defaulted.
    ///
    /// # Errors
    ///
    /// Returns `SortDirectionError` for unrecognized input.
    pub fn parse(s: &str) -> Result<Self, SortDirectionError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" => Ok(Self::Ascending),
            "DESC" | "DESCENDING" => Ok(Self::Descending),
            _ => Err(SortDirectionError(s.to_owned())),
        }
    }

    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for SortDirection {
    type Err = SortDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A request for one page of a sorted listing.
///
/// `F` is the entity-specific sort field, so only columns the store knows
/// about can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<F> {
    /// Zero-based page index.
    pub page_index: u32,
    /// Elements per page, always greater than zero.
    pub page_size: u32,
    /// Sort direction.
    pub direction: SortDirection,
    /// Field to sort by.
    pub sort: F,
}

impl<F> PageRequest<F> {
    /// Number of rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.page_size)
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    /// Build a page for the given request.
    #[must_use]
    pub fn new<F>(content: Vec<T>, request: &PageRequest<F>, total_elements: u64) -> Self {
        Self {
            content,
            page_index: request.page_index,
            page_size: request.page_size,
            total_elements,
        }
    }

    /// Total number of pages (zero when there are no elements).
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.page_size))
    }

    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.page_index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        u64::from(self.page_index) + 1 >= self.total_pages()
    }

    /// Map the page content, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page_index: u32, page_size: u32) -> PageRequest<()> {
        PageRequest {
            page_index,
            page_size,
            direction: SortDirection::Ascending,
            sort: (),
        }
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortDirection::parse("ASC"), Ok(SortDirection::Ascending));
        assert_eq!(
            SortDirection::parse("descending"),
            Ok(SortDirection::Descending)
        );
        assert_eq!(SortDirection::parse(" desc "), Ok(SortDirection::Descending));
        assert_eq!(
            SortDirection::parse("SIDEWAYS"),
            Err(SortDirectionError("SIDEWAYS".to_owned()))
        );
        assert!(SortDirection::parse("").is_err());
    }

    #[test]
    fn test_offset() {
        assert_eq!(request(0, 24).offset(), 0);
        assert_eq!(request(3, 24).offset(), 72);
    }

    #[test]
    fn test_page_navigation() {
        let page = Page::new(vec![1, 2], &request(2, 5), 12);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.is_first());
        assert!(page.is_last());

        let empty: Page<i32> = Page::new(vec![], &request(0, 5), 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(empty.is_first());
        assert!(empty.is_last());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], &request(1, 3), 7).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20, 30]);
        assert_eq!(page.page_index, 1);
        assert_eq!(page.total_elements, 7);
    }
}

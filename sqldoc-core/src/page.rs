//! Paged results for filtered finds.
//!
//! [`PaginationParams`] turn into a query's limit and offset; the matching page is then
//! wrapped in a [`Page`] carrying the total match count and neighbouring page numbers.

use serde::{Deserialize, Serialize};

use crate::query::Query;

/// A single page of results.
///
/// # Example
///
/// ```ignore
/// use sqldoc::page::Page;
///
/// let page: Page<String> = Page::builder(vec!["item1".to_string()])
///     .with_count(100)
///     .with_next_page(Some(2))
///     .build();
///
/// assert_eq!(page.items.len(), 1);
/// assert_eq!(page.count, 100);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page, in query order.
    pub items: Vec<T>,
    /// Total number of matches across all pages.
    pub count: usize,
    /// The next page number, if matches remain after this page.
    pub next_page: Option<usize>,
    /// The previous page number, if this is not the first page.
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    /// Creates a new builder for constructing a page with custom settings.
    pub fn builder(items: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(items)
    }

    /// Converts every item with `f`, keeping the count and navigation data.
    ///
    /// # Errors
    ///
    /// Returns the first error `f` produces.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let people: Page<Person> = documents.try_map(Person::from_document)?;
    /// ```
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?,
            count: self.count,
            next_page: self.next_page,
            previous_page: self.previous_page,
        })
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Builder for [`Page`] instances.
pub struct PageBuilder<T> {
    items: Vec<T>,
    count: usize,
    next_page: Option<usize>,
    previous_page: Option<usize>,
}

impl<T> PageBuilder<T> {
    /// Creates a builder with the given items and no navigation data.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }

    /// Sets the total number of matches across all pages.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the next page number (or `None` if this is the last page).
    pub fn with_next_page(mut self, next_page: Option<usize>) -> Self {
        self.next_page = next_page;
        self
    }

    /// Sets the previous page number (or `None` if this is the first page).
    pub fn with_previous_page(mut self, previous_page: Option<usize>) -> Self {
        self.previous_page = previous_page;
        self
    }

    /// Builds and returns the final [`Page`].
    pub fn build(self) -> Page<T> {
        Page {
            items: self.items,
            count: self.count,
            next_page: self.next_page,
            previous_page: self.previous_page,
        }
    }
}

/// Which page to fetch. Pages are 1-indexed; page 0 is treated as page 1.
///
/// # Example
///
/// ```ignore
/// use sqldoc::page::PaginationParams;
///
/// let params = PaginationParams::new(2, 50);
/// assert_eq!(params.offset(), 50);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of matches per page.
    pub per_page: usize,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    ///
    /// # Arguments
    ///
    /// * `page` - The page number (1-indexed)
    /// * `per_page` - Number of matches per page
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Creates a new builder starting from page 1 with 10 matches per page.
    pub fn builder() -> PaginationParamsBuilder {
        PaginationParamsBuilder::new()
    }

    /// Number of matches skipped before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Returns `query` restricted to this page, replacing its limit and offset.
    pub fn apply(&self, query: &Query) -> Query {
        Query {
            limit: Some(self.per_page),
            offset: Some(self.offset()),
            ..query.clone()
        }
    }

    /// Wraps the items of this page given the total match count.
    pub fn page<T>(&self, items: Vec<T>, count: usize) -> Page<T> {
        let page = self.page.max(1);
        let end = self.offset().saturating_add(items.len());

        Page::builder(items)
            .with_count(count)
            .with_next_page((end < count).then_some(page + 1))
            .with_previous_page((page > 1).then_some(page - 1))
            .build()
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

/// Builder for [`PaginationParams`].
pub struct PaginationParamsBuilder {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl PaginationParamsBuilder {
    pub fn new() -> Self {
        Self { page: None, per_page: None }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Uses page 1 and 10 items per page for unset values.
    pub fn build(self) -> PaginationParams {
        PaginationParams {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(10),
        }
    }
}

impl Default for PaginationParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

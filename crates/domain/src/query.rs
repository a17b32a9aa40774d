use std::collections::BTreeMap;

use admindeck_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rows per page when a page does not configure one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    field: NonEmptyString,
    direction: SortDirection,
}

impl SortSpec {
    /// Creates a validated sort definition.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> AppResult<Self> {
        Ok(Self {
            field: NonEmptyString::new(field)?,
            direction,
        })
    }

    /// Returns the sorted field.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns sort direction.
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaginationInput")]
pub struct Pagination {
    skip: usize,
    limit: usize,
}

/// Unchecked wire form of [`Pagination`].
#[derive(Debug, Deserialize)]
struct PaginationInput {
    #[serde(default)]
    skip: usize,
    limit: usize,
}

impl TryFrom<PaginationInput> for Pagination {
    type Error = AppError;

    fn try_from(input: PaginationInput) -> Result<Self, Self::Error> {
        Self::new(input.skip, input.limit)
    }
}

impl Pagination {
    /// Creates a window; `limit` must be positive.
    pub fn new(skip: usize, limit: usize) -> AppResult<Self> {
        if limit == 0 {
            return Err(AppError::Validation(
                "page size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self { skip, limit })
    }

    /// Rows skipped.
    #[must_use]
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Maximum rows returned.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Zero-based page index.
    #[must_use]
    pub fn page(&self) -> usize {
        self.skip / self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Filter, search, pagination, and sort parameters driving one list fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    filters: BTreeMap<String, Value>,
    search: Option<String>,
    pagination: Pagination,
    sort: Option<SortSpec>,
}

impl QueryState {
    /// Creates an unfiltered first-page query.
    pub fn new(page_size: usize) -> AppResult<Self> {
        Ok(Self {
            pagination: Pagination::new(0, page_size)?,
            ..Self::default()
        })
    }

    /// Returns exact-match filters.
    #[must_use]
    pub fn filters(&self) -> &BTreeMap<String, Value> {
        &self.filters
    }

    /// Returns the search term.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Returns the pagination window.
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Returns the sort definition.
    #[must_use]
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Sets the search term and returns to the first page. Blank terms clear it.
    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_owned());
        self.pagination.skip = 0;
    }

    /// Sets one filter and returns to the first page. `null` removes it.
    pub fn set_filter(&mut self, key: impl Into<String>, value: Value) -> AppResult<()> {
        let key = NonEmptyString::new(key)?;
        if value.is_null() {
            self.filters.remove(key.as_str());
        } else {
            self.filters.insert(key.into(), value);
        }
        self.pagination.skip = 0;
        Ok(())
    }

    /// Moves to a zero-based page index.
    pub fn set_page(&mut self, page: usize) {
        self.pagination.skip = page.saturating_mul(self.pagination.limit);
    }

    /// Changes the page size and returns to the first page.
    pub fn set_page_size(&mut self, limit: usize) -> AppResult<()> {
        self.pagination = Pagination::new(0, limit)?;
        Ok(())
    }

    /// Replaces the sort definition.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    /// Number of pages needed for `total` rows; at least one.
    #[must_use]
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.pagination.limit).max(1)
    }

    /// Encodes the query as backend parameters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("skip".to_owned(), self.pagination.skip.to_string()),
            ("limit".to_owned(), self.pagination.limit.to_string()),
        ];

        if let Some(search) = &self.search {
            params.push(("search".to_owned(), search.clone()));
        }

        if let Some(sort) = &self.sort {
            params.push(("sort".to_owned(), sort.field().to_owned()));
            params.push(("order".to_owned(), sort.direction().as_str().to_owned()));
        }

        for (key, value) in &self.filters {
            let encoded = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            params.push((format!("filter.{key}"), encoded));
        }

        params
    }
}

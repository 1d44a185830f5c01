//! Pagination for call-history queries
//!
//! Pages are 0-indexed. A page past the end yields empty content rather
//! than being clamped.

use pcs_common::{Error, Result};
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sortable call-history columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    Endpoint,
    HttpStatusCode,
    HttpMethod,
}

impl SortField {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "timestamp" => Ok(SortField::Timestamp),
            "endpoint" => Ok(SortField::Endpoint),
            "http_status_code" | "httpStatusCode" => Ok(SortField::HttpStatusCode),
            "http_method" | "httpMethod" => Ok(SortField::HttpMethod),
            other => Err(Error::InvalidInput(format!(
                "Unsupported sort field: {} (expected timestamp, endpoint, http_status_code or http_method)",
                other
            ))),
        }
    }

    /// Column name; only these values are ever interpolated into SQL
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::Endpoint => "endpoint",
            SortField::HttpStatusCode => "http_status_code",
            SortField::HttpMethod => "http_method",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported sort direction: {} (expected ASC or DESC)",
                s
            ))),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, size: i64, sort_by: SortField, direction: SortDirection) -> Result<Self> {
        if page < 0 {
            return Err(Error::InvalidInput("Page number must be 0 or greater".into()));
        }
        if !(1..=MAX_PAGE_SIZE as i64).contains(&size) {
            return Err(Error::InvalidInput(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| Error::InvalidInput("Page number is too large".into()))?;

        Ok(Self {
            page,
            size: size as u32,
            sort_by,
            direction,
        })
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    /// `ORDER BY` clause built from whitelisted parts only
    pub fn order_by(&self) -> String {
        format!(
            "ORDER BY {} {}, id {}",
            self.sort_by.column(),
            self.direction.keyword(),
            self.direction.keyword()
        )
    }
}

/// Total page count for a result set
pub fn total_pages(total_elements: u64, size: u32) -> u64 {
    let size = size.max(1) as u64;
    (total_elements + size - 1) / size
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub content: Vec<T>,
    pub first: bool,
    pub last: bool,
    pub size: u32,
    pub number: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let total_pages = total_pages(total_elements, request.size);
        Self {
            content,
            first: request.page == 0,
            last: request.page as u64 + 1 >= total_pages,
            size: request.size,
            number: request.page,
            total_elements,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            content: self.content.into_iter().map(f).collect(),
            first: self.first,
            last: self.last,
            size: self.size,
            number: self.number,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

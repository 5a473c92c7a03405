//! Page-number pagination for list endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// `page` and `page_size` query parameters
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Must be greater than or equal to 1."))]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Must be greater than or equal to 1 and less than or equal to 100."))]
    pub page_size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.page_size)
    }
}

/// Pagination block of a list response
///
/// Keys are left out the same way flask-smorest does it: an empty result set
/// only reports `total` and `total_pages`, and a page past the end drops
/// `page`, `previous_page` and `next_page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationMetadata {
    pub total: i64,
    pub total_pages: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<i64>,
}

impl PaginationMetadata {
    pub fn new(params: &PageParams, total: i64) -> Self {
        let mut meta = Self {
            total,
            total_pages: 0,
            first_page: None,
            last_page: None,
            page: None,
            previous_page: None,
            next_page: None,
        };
        if total <= 0 {
            return meta;
        }

        let last_page = (total - 1) / params.page_size + 1;
        meta.total_pages = last_page;
        meta.first_page = Some(1);
        meta.last_page = Some(last_page);

        if params.page <= last_page {
            meta.page = Some(params.page);
            if params.page > 1 {
                meta.previous_page = Some(params.page - 1);
            }
            if params.page < last_page {
                meta.next_page = Some(params.page + 1);
            }
        }
        meta
    }
}

/// Paginated list response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub pagination: PaginationMetadata,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(params: &PageParams, results: Vec<T>, total: i64) -> Self {
        Self {
            pagination: PaginationMetadata::new(params, total),
            results,
        }
    }
}

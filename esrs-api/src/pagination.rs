//! Pagination for list endpoints

use serde::{Deserialize, Serialize};

/// Default and maximum page size
pub const PAGE_SIZE: i64 = 100;

/// Pagination metadata returned with every page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// `?page=&page_size=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Clamp the requested page into `[1, total_pages]` and derive the offset
///
/// ```
/// use esrs_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 2, 100);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
/// ```
pub fn calculate_pagination(total_items: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.clamp(1, PAGE_SIZE);
    let total_pages = (total_items + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        page_size,
        total_items,
        total_pages,
        offset: (page - 1) * page_size,
    }
}

impl PageQuery {
    pub fn resolve(&self, total_items: i64) -> Pagination {
        calculate_pagination(
            total_items,
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PAGE_SIZE),
        )
    }
}

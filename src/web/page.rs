use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Pagination window over `item_count` items.
///
/// An empty collection or a page index past the end resets to page 1 with
/// an empty window (`offset == 0`, `limit == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: i64,
    pub page_size: i64,
    pub page_count: i64,
    pub page_index: i64,
    pub offset: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub fn new(item_count: i64, page_index: i64, page_size: i64) -> Self {
        let item_count = item_count.max(0);
        let page_size = page_size.max(1);
        let page_count = item_count / page_size + i64::from(item_count % page_size > 0);

        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            let page_index = page_index.max(1);
            (page_index, page_size * (page_index - 1), page_size)
        };

        Self {
            item_count,
            page_size,
            page_count,
            page_index,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    pub fn with_default_size(item_count: i64, page_index: i64) -> Self {
        Self::new(item_count, page_index, DEFAULT_PAGE_SIZE)
    }
}

/// Page number from a query parameter; anything unparsable or below 1 is page 1.
pub fn get_page_index(raw: Option<&str>) -> i64 {
    raw.and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|&page| page >= 1)
        .unwrap_or(1)
}

use serde::{Deserialize, Serialize};

/// One page of an ordered sequence plus metadata about the whole sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

/// Pagination metadata without the items, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl<T> PageResult<T> {
    pub fn info(&self) -> PageInfo {
        PageInfo {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Slice page `page` (1-based) of `page_size` items out of `items`.
///
/// Pages past the end yield no items but keep the metadata. There is always
/// at least one page, even for an empty sequence. Order is preserved.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> PageResult<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_items = items.len() as u64;
    let total_pages = total_items
        .div_ceil(u64::from(page_size))
        .max(1)
        .min(u64::from(u32::MAX));

    let size = page_size as usize;
    let start = (page as usize - 1).saturating_mul(size);
    let items = items.into_iter().skip(start).take(size).collect();

    PageResult {
        items,
        current_page: page,
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        total_items,
    }
}

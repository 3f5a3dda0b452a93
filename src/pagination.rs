//! Fixed-size page slicing shared by every transaction view.

use serde::Serialize;

/// Rows shown per page in transaction views.
pub const PAGE_SIZE: usize = 10;

/// One page of a borrowed sequence.
#[derive(Debug, PartialEq, Serialize)]
pub struct Page<'a, T> {
    /// 1-based page number that was requested
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items: &'a [T],
}

/// Number of pages needed to show `len` items, `ceil(len / page_size)`.
///
/// A `page_size` of zero yields zero pages.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Slice `items` to the 1-based `page` of size `page_size`.
///
/// The slice is `[(page - 1) * page_size, page * page_size)` clamped to the
/// sequence. Page 0 and pages past the end give an empty slice, never an
/// error.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let start = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .map_or(items.len(), |s| s.min(items.len()));
    let end = page
        .checked_mul(page_size)
        .map_or(items.len(), |e| e.min(items.len()))
        .max(start);

    Page {
        page,
        page_size,
        total_pages: total_pages(items.len(), page_size),
        total_items: items.len(),
        items: &items[start..end],
    }
}

/// Default number of records returned per page.
pub const PAGE_SIZE: usize = 20;

/// Translates a 1-based page number into an `(offset, limit)` pair.
///
/// A missing or non-positive page is treated as the first page, and a zero
/// `page_size` falls back to [`PAGE_SIZE`].
pub fn offset_and_limit(page: Option<i32>, page_size: usize) -> (usize, usize) {
    let page = match page {
        Some(p) if p > 0 => (p - 1) as usize,
        _ => 0,
    };
    let limit = if page_size == 0 { PAGE_SIZE } else { page_size };

    (page * limit, limit)
}

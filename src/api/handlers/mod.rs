pub mod health;
pub mod logs;
pub mod predictions;
pub mod rings;
pub mod warnings;
pub mod work_orders;

use serde::Deserialize;

/// Shared pagination query params (section 6: "pagination (`page`,
/// `page_size <= 100`)").
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

impl Pagination {
    pub fn clamped_page_size(&self) -> usize {
        self.page_size.clamp(1, 100)
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Slices `items` to this page, returning `(slice, total_pages)`.
    pub fn paginate<T: Clone>(&self, items: &[T]) -> (Vec<T>, usize) {
        let page_size = self.clamped_page_size();
        let total_pages = items.len().div_ceil(page_size).max(1);
        let start = (self.page() - 1) * page_size;
        let page_items = items.get(start..).unwrap_or(&[]).iter().take(page_size).cloned().collect();
        (page_items, total_pages)
    }
}

/// One page of a longer list. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_items: usize,
    /// At least 1, so an empty list still has a first page.
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `items` into page `page`. Returns `None` for page 0 or a page past
/// the end.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Option<Paginated<T>> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);

    if page == 0 || page > total_pages {
        return None;
    }

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);
    Some(Paginated {
        items: items[start..end].to_vec(),
        page,
        total_items,
        total_pages,
    })
}

/// Numbered buttons shown at once, not counting first/last
pub const MAX_PAGE_BUTTONS: u32 = 5;

/// One slot in the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page { number: u32, current: bool },
    Ellipsis,
}

/// Current page plus how many pages the last search produced.
///
/// `total_pages` of 0 means "nothing to page through" - used both for an
/// empty listing and after a failed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current: u32,
    total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            total_pages: 0,
        }
    }
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// `total_pages` is expected to already respect the result cap,
    /// see [`crate::search::total_pages`]
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages;
        if self.total_pages > 0 {
            self.current = self.current.clamp(1, self.total_pages);
        }
    }

    /// Back to page 1, nothing loaded yet
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Hide the pager, keeping the page the user asked for
    pub fn hide(&mut self) {
        self.total_pages = 0;
    }

    /// Pager only shows up when there's somewhere to go
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    /// Move forward one page, if there is one
    pub fn next(&mut self) -> Option<u32> {
        if !self.has_next() {
            return None;
        }
        self.current += 1;
        Some(self.current)
    }

    pub fn prev(&mut self) -> Option<u32> {
        if !self.has_prev() {
            return None;
        }
        self.current -= 1;
        Some(self.current)
    }

    /// Jump to `page`. `None` when it's out of range or already current.
    pub fn go_to(&mut self, page: u32) -> Option<u32> {
        if page == 0 || page > self.total_pages || page == self.current {
            return None;
        }
        self.current = page;
        Some(page)
    }

    /// The buttons to draw: a window of up to five pages around the current
    /// one, plus first/last with ellipses when they're out of the window.
    pub fn window(&self) -> Vec<PageItem> {
        if !self.is_visible() {
            return Vec::new();
        }

        let total = self.total_pages;
        let mut start = self.current.saturating_sub(MAX_PAGE_BUTTONS / 2).max(1);
        let end = (start + MAX_PAGE_BUTTONS - 1).min(total);
        if end - start + 1 < MAX_PAGE_BUTTONS {
            start = (end + 1).saturating_sub(MAX_PAGE_BUTTONS).max(1);
        }

        let page = |number| PageItem::Page {
            number,
            current: number == self.current,
        };

        let mut items = Vec::new();
        if start > 1 {
            items.push(page(1));
            if start > 2 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.extend((start..=end).map(page));
        if end < total {
            if end < total - 1 {
                items.push(PageItem::Ellipsis);
            }
            items.push(page(total));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(current: u32, total: u32) -> Pagination {
        let mut p = Pagination::new();
        p.set_total_pages(total);
        p.go_to(current);
        p
    }

    fn render(items: &[PageItem]) -> String {
        items
            .iter()
            .map(|item| match item {
                PageItem::Page { number, current: true } => format!("[{}]", number),
                PageItem::Page { number, .. } => number.to_string(),
                PageItem::Ellipsis => "…".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_window_in_the_middle() {
        assert_eq!(render(&at(6, 34).window()), "1 … 4 5 [6] 7 8 … 34");
    }

    #[test]
    fn test_window_at_the_edges() {
        assert_eq!(render(&at(1, 34).window()), "[1] 2 3 4 5 … 34");
        assert_eq!(render(&at(34, 34).window()), "1 … 30 31 32 33 [34]");
        assert_eq!(render(&at(4, 34).window()), "1 2 3 [4] 5 6 … 34");
    }

    #[test]
    fn test_window_with_few_pages() {
        assert_eq!(render(&at(2, 3).window()), "1 [2] 3");
        assert!(at(1, 1).window().is_empty());
        assert!(Pagination::new().window().is_empty());
    }

    #[test]
    fn test_next_and_prev_stay_in_range() {
        let mut p = at(1, 2);
        assert_eq!(p.prev(), None);
        assert_eq!(p.next(), Some(2));
        assert_eq!(p.next(), None);
        assert_eq!(p.current(), 2);
        assert_eq!(p.prev(), Some(1));
    }

    #[test]
    fn test_go_to_rejects_out_of_range() {
        let mut p = at(1, 5);
        assert_eq!(p.go_to(0), None);
        assert_eq!(p.go_to(6), None);
        assert_eq!(p.go_to(1), None);
        assert_eq!(p.go_to(5), Some(5));
    }

    #[test]
    fn test_shrinking_total_clamps_current() {
        let mut p = at(30, 34);
        assert_eq!(p.total_pages(), 34);

        p.set_total_pages(3);
        assert_eq!(p.current(), 3);
    }

    #[test]
    fn test_hidden_after_error() {
        let mut p = at(3, 10);
        p.hide();
        assert!(!p.is_visible());
        assert!(!p.has_next());
        assert_eq!(p.current(), 3);
    }
}

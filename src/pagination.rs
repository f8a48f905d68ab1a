use std::num::IntErrorKind;

use serde::Deserialize;

/// Query string of every paginated view. The page is kept raw so that a
/// garbage value falls back to the first page instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    page: Option<String>,
}

impl PageParams {
    pub fn new(page: Option<&str>) -> Self {
        Self {
            page: page.map(Into::into),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// An empty set still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Missing or non numeric pages resolve to the first page, out of range
    /// ones (zero, negative or past the end) to the last.
    pub fn validate_number(&self, raw: Option<&str>) -> u64 {
        let Some(raw) = raw else {
            return 1;
        };
        match raw.trim().parse::<i64>() {
            Ok(number) if number >= 1 && number as u64 <= self.num_pages() => number as u64,
            Ok(_) => self.num_pages(),
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                self.num_pages()
            }
            Err(_) => 1,
        }
    }

    pub fn window(&self, raw: Option<&str>) -> PageWindow {
        let number = self.validate_number(raw);
        PageWindow {
            number,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    pub fn page<T>(&self, window: PageWindow, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: window.number,
            num_pages: self.num_pages(),
            count: self.count,
        }
    }

    pub fn paginate_slice<T: Clone>(items: &[T], per_page: u64, raw: Option<&str>) -> Page<T> {
        let paginator = Self::new(items.len() as u64, per_page);
        let window = paginator.window(raw);
        let start = (window.offset as usize).min(items.len());
        let end = (start + window.limit as usize).min(items.len());
        paginator.page(window, items[start..end].to_vec())
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: u64) -> Vec<u64> {
        (0..n).collect()
    }

    #[test]
    fn test_missing_or_garbage_page_is_first() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.validate_number(None), 1);
        assert_eq!(paginator.validate_number(Some("abc")), 1);
        assert_eq!(paginator.validate_number(Some("2.0")), 1);
        assert_eq!(paginator.validate_number(Some("")), 1);
    }

    #[test]
    fn test_out_of_range_page_is_last() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.validate_number(Some("4")), 3);
        assert_eq!(paginator.validate_number(Some("0")), 3);
        assert_eq!(paginator.validate_number(Some("-1")), 3);
        assert_eq!(paginator.validate_number(Some("99999999999999999999999")), 3);
        assert_eq!(paginator.validate_number(Some(" 2 ")), 2);
    }

    #[test]
    fn test_empty_set_is_single_empty_page() {
        let page = Paginator::paginate_slice::<u64>(&[], 10, Some("3"));
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.is_empty());
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_fifteen_records_split_ten_and_five() {
        let items = records(15);
        let first = Paginator::paginate_slice(&items, 10, None);
        let second = Paginator::paginate_slice(&items, 10, Some("2"));
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);
        assert!(first.has_next());
        assert!(!second.has_next());
        assert!(second.has_previous());
        assert_eq!(second.previous_page_number(), 1);
    }

    #[test]
    fn test_consecutive_pages_have_no_gaps_or_duplicates() {
        for total in [0u64, 1, 9, 10, 11, 19, 20, 37] {
            let items = records(total);
            let paginator = Paginator::new(total, 10);
            for k in 1..=paginator.num_pages() {
                let mut joined = Vec::new();
                for p in 1..=k {
                    let raw = p.to_string();
                    joined.extend(Paginator::paginate_slice(&items, 10, Some(&raw)).items);
                }
                let expected = (k * 10).min(total) as usize;
                assert_eq!(joined, items[..expected].to_vec(), "total={total} k={k}");
            }
        }
    }

    #[test]
    fn test_window_offsets() {
        let paginator = Paginator::new(19, 10);
        assert_eq!(
            paginator.window(Some("2")),
            PageWindow {
                number: 2,
                offset: 10,
                limit: 10
            }
        );
    }
}

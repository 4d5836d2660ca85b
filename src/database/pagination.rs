use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// Page number and page size taken from `?page=&limit=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_size: i64) -> Self {
        Self {
            // keeps `offset()` inside i64 for any page size
            page: page.unwrap_or(1).clamp(1, i64::MAX / MAX_PAGE_SIZE),
            page_size: limit.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if rows.is_empty() && total_rows <= 0 {
            return Self::no_rows();
        }
        let page_count = (total_rows + request.page_size - 1) / request.page_size;

        let next = (request.page < page_count).then_some(request.page + 1);
        let previous = (request.page > 1).then(|| (request.page - 1).min(page_count.max(1)));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_both_ways() {
        let request = PageRequest::new(Some(2), Some(6), 6);
        let page = PageContext::from_rows(vec![0; 6], 20, request);

        assert_eq!(request.offset(), 6);
        assert_eq!(page.count, 20);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let request = PageRequest::new(Some(4), Some(6), 6);
        let page = PageContext::from_rows(vec![0; 2], 20, request);

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));
    }

    #[test]
    fn empty_result_is_a_single_empty_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, PageRequest::new(None, None, 6));

        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn request_is_clamped() {
        let request = PageRequest::new(Some(-3), Some(10_000), 6);

        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let request = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE), 6);

        assert!(request.offset() > 0);
        assert_eq!(request.page, i64::MAX / MAX_PAGE_SIZE);
    }

    #[test]
    fn page_past_the_end_links_back() {
        let request = PageRequest::new(Some(9), Some(6), 6);
        let page: PageContext<i32> = PageContext::from_rows(vec![], 20, request);

        assert_eq!(page.count, 20);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(4));
        assert!(page.results.is_empty());
    }
}

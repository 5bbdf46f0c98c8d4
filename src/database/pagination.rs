use serde::{Deserialize, Serialize};

use crate::config;

/// Query-string pagination parameters (`?page=1&page_size=25`)
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    /// 1-based page, clamped to configured bounds
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        let api = &config::config().api;
        self.page_size
            .unwrap_or(api.default_page_size)
            .clamp(1, api.max_page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, query: &PageQuery) -> Self {
        Self {
            data,
            total,
            page: query.page(),
            page_size: query.page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_offset_are_clamped() {
        let q = PageQuery { page: Some(0), page_size: Some(10) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.offset(), 0);

        let q = PageQuery { page: Some(3), page_size: Some(10) };
        assert_eq!(q.offset(), 20);

        let q = PageQuery { page: None, page_size: Some(0) };
        assert_eq!(q.page_size(), 1);
    }
}

//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            per_page: Some(20),
        }
    }
}

impl PaginationParams {
    pub fn get_offset(&self) -> i64 {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.get_limit();
        (page - 1) * per_page
    }

    pub fn get_limit(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            data,
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let params = PaginationParams {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(params.get_offset(), 20);
        assert_eq!(params.get_limit(), 10);
    }

    #[test]
    fn test_defaults_and_clamping() {
        let params = PaginationParams {
            page: None,
            per_page: None,
        };
        assert_eq!(params.get_offset(), 0);
        assert_eq!(params.get_limit(), 20);

        let params = PaginationParams {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(params.get_offset(), 0);
        assert_eq!(params.get_limit(), 100);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let resp = PaginatedResponse::new(vec![1, 2, 3], 1, 20, 41);
        assert_eq!(resp.total_pages, 3);
    }
}

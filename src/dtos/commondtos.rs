use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

impl RequestQueryDto {
    /// `(limit, offset)` for SQL paging, defaulting to the first 50 rows.
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50);
        let page = self.page.unwrap_or(1).max(1);
        (limit as i64, ((page - 1) * limit) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        assert_eq!(RequestQueryDto::default().limit_offset(), (50, 0));

        let query = RequestQueryDto {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(query.limit_offset(), (20, 40));
    }

    #[test]
    fn test_limit_is_bounded() {
        let query = RequestQueryDto {
            page: Some(1),
            limit: Some(500),
        };
        assert!(query.validate().is_err());
    }
}

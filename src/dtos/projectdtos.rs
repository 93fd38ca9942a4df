use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProjectDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 10000, message = "Description must be between 10 and 10000 characters"))]
    pub description: String,

    #[validate(range(min = 1, message = "Budget must be positive"))]
    pub budget: i64,

    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaceBidDto {
    #[validate(range(min = 1, message = "Bid amount must be positive"))]
    pub amount: i64,

    #[validate(length(min = 10, max = 5000, message = "Proposal must be between 10 and 5000 characters"))]
    pub proposal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    #[serde(default)]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_rating_range() {
        let mut dto = SubmitReviewDto {
            rating: 5,
            comment: "Great work".to_string(),
        };
        assert!(dto.validate().is_ok());

        dto.rating = 0;
        assert!(dto.validate().is_err());

        dto.rating = 6;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_bid_requires_positive_amount() {
        let dto = PlaceBidDto {
            amount: 0,
            proposal: "I can build this in two weeks".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}

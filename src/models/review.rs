// src/models/review.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// DTO for displaying a review with author info.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub title_id: i64,
    pub author_id: i64,
    pub author: String,
    pub score: i32,
    pub text: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new review.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Review text must be between 1 and 5000 characters."
    ))]
    pub text: String,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i32,
}

/// DTO for updating a review. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i32>,
}

/// Write model for inserting a review row.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub title_id: i64,
    pub author_id: i64,
    pub score: i32,
    pub text: String,
}

/// DTO for displaying a comment with author info.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub author: String,
    pub text: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters."
    ))]
    pub text: String,
}

/// DTO for updating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: Option<String>,
}

/// Write model for inserting a comment row.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub review_id: i64,
    pub author_id: i64,
    pub text: String,
}

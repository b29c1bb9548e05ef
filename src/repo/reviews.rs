// src/repo/reviews.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::review::{
    CommentResponse, NewComment, NewReview, ReviewResponse, UpdateCommentRequest,
    UpdateReviewRequest,
};
use crate::repo::{Repository, is_unique_violation};

const REVIEW_SELECT: &str = "SELECT r.id, r.title_id, r.author_id, u.username AS author, \
    r.score, r.text, r.created_at \
    FROM reviews r \
    JOIN users u ON u.id = r.author_id";

/// Repository for reviews, keyed by (title_id, review_id) so a review can
/// only be addressed through the title it belongs to.
///
/// The one-review-per-user-per-title rule is enforced twice on purpose:
/// [`ReviewRepo::exists_for`] gives an early, well-worded rejection, and the
/// schema's UNIQUE (title_id, author_id) constraint settles concurrent
/// creates. `create` translates the constraint violation, so both layers
/// surface the same error.
#[derive(Clone)]
pub struct ReviewRepo {
    pool: PgPool,
}

impl ReviewRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Early duplicate check for review creation.
    pub async fn exists_for(&self, title_id: i64, author_id: i64) -> Result<bool, AppError> {
        let existing = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing.is_some())
    }
}

#[async_trait]
impl Repository for ReviewRepo {
    type Entity = ReviewResponse;
    type Key = (i64, i64);
    type Create = NewReview;
    type Patch = UpdateReviewRequest;
    type Filter = i64;

    async fn create(&self, data: NewReview) -> Result<ReviewResponse, AppError> {
        let review_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO reviews (title_id, author_id, score, text) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(data.title_id)
        .bind(data.author_id)
        .bind(data.score)
        .bind(&data.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // Concurrent create lost the race; same answer as the early check.
                AppError::DuplicateReview
            } else {
                tracing::error!("Failed to create review: {:?}", e);
                AppError::from(e)
            }
        })?;

        self.get(&(data.title_id, review_id))
            .await?
            .ok_or(AppError::Internal("Review vanished after insert".to_string()))
    }

    async fn get(&self, key: &(i64, i64)) -> Result<Option<ReviewResponse>, AppError> {
        let (title_id, review_id) = *key;

        let review = sqlx::query_as::<_, ReviewResponse>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 AND r.id = $2"
        ))
        .bind(title_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn update(
        &self,
        key: &(i64, i64),
        patch: UpdateReviewRequest,
    ) -> Result<ReviewResponse, AppError> {
        let (title_id, review_id) = *key;

        if let Some(text) = patch.text {
            sqlx::query("UPDATE reviews SET text = $1 WHERE title_id = $2 AND id = $3")
                .bind(text)
                .bind(title_id)
                .bind(review_id)
                .execute(&self.pool)
                .await?;
        }

        if let Some(score) = patch.score {
            sqlx::query("UPDATE reviews SET score = $1 WHERE title_id = $2 AND id = $3")
                .bind(score)
                .bind(title_id)
                .bind(review_id)
                .execute(&self.pool)
                .await?;
        }

        self.get(key)
            .await?
            .ok_or(AppError::NotFound("Review not found".to_string()))
    }

    async fn delete(&self, key: &(i64, i64)) -> Result<bool, AppError> {
        let (title_id, review_id) = *key;

        let result = sqlx::query("DELETE FROM reviews WHERE title_id = $1 AND id = $2")
            .bind(title_id)
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete review: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, title_id: &i64) -> Result<Vec<ReviewResponse>, AppError> {
        let reviews = sqlx::query_as::<_, ReviewResponse>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.review_id, c.author_id, u.username AS author, \
    c.text, c.created_at \
    FROM comments c \
    JOIN users u ON u.id = c.author_id";

/// Repository for comments, keyed by (review_id, comment_id). Handlers
/// resolve the review against its title before reaching for comments.
#[derive(Clone)]
pub struct CommentRepo {
    pool: PgPool,
}

impl CommentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for CommentRepo {
    type Entity = CommentResponse;
    type Key = (i64, i64);
    type Create = NewComment;
    type Patch = UpdateCommentRequest;
    type Filter = i64;

    async fn create(&self, data: NewComment) -> Result<CommentResponse, AppError> {
        let comment_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO comments (review_id, author_id, text) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(data.review_id)
        .bind(data.author_id)
        .bind(&data.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            AppError::from(e)
        })?;

        self.get(&(data.review_id, comment_id))
            .await?
            .ok_or(AppError::Internal("Comment vanished after insert".to_string()))
    }

    async fn get(&self, key: &(i64, i64)) -> Result<Option<CommentResponse>, AppError> {
        let (review_id, comment_id) = *key;

        let comment = sqlx::query_as::<_, CommentResponse>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 AND c.id = $2"
        ))
        .bind(review_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn update(
        &self,
        key: &(i64, i64),
        patch: UpdateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        let (review_id, comment_id) = *key;

        if let Some(text) = patch.text {
            sqlx::query("UPDATE comments SET text = $1 WHERE review_id = $2 AND id = $3")
                .bind(text)
                .bind(review_id)
                .bind(comment_id)
                .execute(&self.pool)
                .await?;
        }

        self.get(key)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))
    }

    async fn delete(&self, key: &(i64, i64)) -> Result<bool, AppError> {
        let (review_id, comment_id) = *key;

        let result = sqlx::query("DELETE FROM comments WHERE review_id = $1 AND id = $2")
            .bind(review_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete comment: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, review_id: &i64) -> Result<Vec<CommentResponse>, AppError> {
        let comments = sqlx::query_as::<_, CommentResponse>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.created_at ASC"
        ))
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}

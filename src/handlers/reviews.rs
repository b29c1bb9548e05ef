// src/handlers/reviews.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::review::{
        CreateCommentRequest, CreateReviewRequest, NewComment, NewReview, ReviewResponse,
        UpdateCommentRequest, UpdateReviewRequest,
    },
    permissions::{self, Action, Actor, Resource},
    repo::Repository,
    state::AppState,
};

async fn ensure_title(state: &AppState, title_id: i64) -> Result<(), AppError> {
    state
        .titles
        .get(&title_id)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;
    Ok(())
}

async fn fetch_review(
    state: &AppState,
    title_id: i64,
    review_id: i64,
) -> Result<ReviewResponse, AppError> {
    state
        .reviews
        .get(&(title_id, review_id))
        .await?
        .ok_or(AppError::NotFound("Review not found".to_string()))
}

/// Lists a title's reviews.
pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Title)?;
    ensure_title(&state, title_id).await?;

    let reviews = state.reviews.list(&title_id).await?;

    Ok(Json(reviews))
}

/// Creates a review for a title.
/// Requires: Login. One review per user per title.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = actor.id().unwrap_or_default();
    permissions::require(&actor, Action::Create, &Resource::Review { author_id })?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    ensure_title(&state, title_id).await?;

    // Early check for a clean error message; the unique constraint behind
    // ReviewRepo::create is what settles concurrent requests.
    if state.reviews.exists_for(title_id, author_id).await? {
        return Err(AppError::DuplicateReview);
    }

    let review = state
        .reviews
        .create(NewReview {
            title_id,
            author_id,
            score: payload.score,
            text: payload.text,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = fetch_review(&state, title_id, review_id).await?;
    permissions::require(
        &actor,
        Action::Read,
        &Resource::Review {
            author_id: review.author_id,
        },
    )?;

    Ok(Json(review))
}

/// Updates a review.
/// Requires: Login + (Author OR Moderator OR Admin).
pub async fn update_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let review = fetch_review(&state, title_id, review_id).await?;
    permissions::require(
        &actor,
        Action::Update,
        &Resource::Review {
            author_id: review.author_id,
        },
    )?;

    let review = state.reviews.update(&(title_id, review_id), payload).await?;

    Ok(Json(review))
}

/// Deletes a review.
/// Requires: Login + (Author OR Moderator OR Admin).
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = fetch_review(&state, title_id, review_id).await?;
    permissions::require(
        &actor,
        Action::Delete,
        &Resource::Review {
            author_id: review.author_id,
        },
    )?;

    if !state.reviews.delete(&(title_id, review_id)).await? {
        return Err(AppError::NotFound("Review not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all comments on a review.
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = fetch_review(&state, title_id, review_id).await?;
    permissions::require(
        &actor,
        Action::Read,
        &Resource::Review {
            author_id: review.author_id,
        },
    )?;

    let comments = state.comments.list(&review_id).await?;

    Ok(Json(comments))
}

/// Creates a comment on a review.
/// Requires: Login.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = actor.id().unwrap_or_default();
    permissions::require(&actor, Action::Create, &Resource::Comment { author_id })?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    fetch_review(&state, title_id, review_id).await?;

    let comment = state
        .comments
        .create(NewComment {
            review_id,
            author_id,
            text: payload.text,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_review(&state, title_id, review_id).await?;

    let comment = state
        .comments
        .get(&(review_id, comment_id))
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    permissions::require(
        &actor,
        Action::Read,
        &Resource::Comment {
            author_id: comment.author_id,
        },
    )?;

    Ok(Json(comment))
}

/// Updates a comment.
/// Requires: Login + (Author OR Moderator OR Admin).
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    fetch_review(&state, title_id, review_id).await?;

    let comment = state
        .comments
        .get(&(review_id, comment_id))
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    permissions::require(
        &actor,
        Action::Update,
        &Resource::Comment {
            author_id: comment.author_id,
        },
    )?;

    let comment = state
        .comments
        .update(&(review_id, comment_id), payload)
        .await?;

    Ok(Json(comment))
}

/// Deletes a comment.
/// Requires: Login + (Author OR Moderator OR Admin).
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    fetch_review(&state, title_id, review_id).await?;

    let comment = state
        .comments
        .get(&(review_id, comment_id))
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    permissions::require(
        &actor,
        Action::Delete,
        &Resource::Comment {
            author_id: comment.author_id,
        },
    )?;

    if !state.comments.delete(&(review_id, comment_id)).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

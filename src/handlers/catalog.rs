// src/handlers/catalog.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::catalog::{
        CreateTermRequest, CreateTitleRequest, TermListParams, TitleListParams,
        UpdateTermRequest, UpdateTitleRequest,
    },
    permissions::{self, Action, Actor, Resource},
    repo::Repository,
    state::AppState,
};

/// Lists categories, optionally filtered by a name search keyword.
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TermListParams>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Category)?;

    let categories = state.categories.list(&params).await?;

    Ok(Json(categories))
}

/// Creates a category. Admin only.
pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Create, &Resource::Category)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let category = state.categories.create(payload).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Category)?;

    let category = state
        .categories
        .get(&slug)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Updates a category by slug. Admin only.
pub async fn update_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Update, &Resource::Category)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let category = state.categories.update(&slug, payload).await?;

    Ok(Json(category))
}

/// Deletes a category by slug. Admin only.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Delete, &Resource::Category)?;

    if !state.categories.delete(&slug).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists genres, optionally filtered by a name search keyword.
pub async fn list_genres(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TermListParams>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Genre)?;

    let genres = state.genres.list(&params).await?;

    Ok(Json(genres))
}

/// Creates a genre. Admin only.
pub async fn create_genre(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Create, &Resource::Genre)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let genre = state.genres.create(payload).await?;

    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn get_genre(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Genre)?;

    let genre = state
        .genres
        .get(&slug)
        .await?
        .ok_or(AppError::NotFound("Genre not found".to_string()))?;

    Ok(Json(genre))
}

/// Updates a genre by slug. Admin only.
pub async fn update_genre(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Update, &Resource::Genre)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let genre = state.genres.update(&slug, payload).await?;

    Ok(Json(genre))
}

/// Deletes a genre by slug. Admin only.
pub async fn delete_genre(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Delete, &Resource::Genre)?;

    if !state.genres.delete(&slug).await? {
        return Err(AppError::NotFound("Genre not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists titles with their computed ratings.
/// Supports category/genre slug filters, name search and year.
pub async fn list_titles(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TitleListParams>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Title)?;

    let titles = state.titles.list(&params).await?;

    Ok(Json(titles))
}

/// Creates a title. Admin only.
/// The category slug must resolve, as must every genre slug.
pub async fn create_title(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Create, &Resource::Title)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let title = state.titles.create(payload).await?;

    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn get_title(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Title)?;

    let title = state
        .titles
        .get(&title_id)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;

    Ok(Json(title))
}

/// Updates a title by ID. Admin only.
pub async fn update_title(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Update, &Resource::Title)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let title = state.titles.update(&title_id, payload).await?;

    Ok(Json(title))
}

/// Deletes a title by ID. Admin only.
pub async fn delete_title(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Delete, &Resource::Title)?;

    if !state.titles.delete(&title_id).await? {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{
        CreateUserRequest, NewUser, UpdateUserRequest, UserListParams, UserRole,
        is_reserved_username,
    },
    permissions::{self, Action, Actor, Resource},
    repo::Repository,
    state::AppState,
    utils::code::generate_confirmation_code,
};

/// Get current user's profile.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = actor.require_id()?;
    permissions::require(&actor, Action::Read, &Resource::Account { owner_id: user_id })?;

    let user = state
        .users
        .get(&user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Update current user's profile.
///
/// Runs the same permission check as any other account update; role,
/// username and email in the payload are silently ignored.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = actor.require_id()?;
    permissions::require(&actor, Action::Update, &Resource::Account { owner_id: user_id })?;

    let user = state
        .users
        .update(&user_id, payload.self_service().into())
        .await?;

    Ok(Json(user))
}

/// Lists all users. Requires a token.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Directory)?;

    let users = state.users.list(&params).await?;

    Ok(Json(users))
}

/// Creates a new user with a specific role.
/// Admin only; a confirmation code is issued so the account can log in.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Create, &Resource::Directory)?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    if is_reserved_username(&payload.username) {
        return Err(AppError::ReservedUsername);
    }

    let code = generate_confirmation_code();

    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            bio: payload.bio,
            role: payload.role.unwrap_or(UserRole::User),
            is_superuser: false,
            confirmation_code: code.clone(),
        })
        .await?;

    if let Err(e) = state
        .notifier
        .send_confirmation_code(&user.username, &user.email, &code)
        .await
    {
        tracing::warn!(
            "Failed to dispatch confirmation code for '{}': {}",
            user.username,
            e
        );
    }

    Ok((StatusCode::CREATED, Json(user)))
}

/// Retrieves a user by username. Requires a token.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    permissions::require(&actor, Action::Read, &Resource::Directory)?;

    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Updates a user by username.
///
/// Admin-capable actors may change anything, including role/username/email;
/// a user addressing their own record is held to the self-service field set.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let target = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    permissions::require(&actor, Action::Update, &Resource::Account { owner_id: target.id })?;

    let payload = if actor.is_admin_capable() {
        payload
    } else {
        payload.self_service()
    };

    let user = state.users.update(&target.id, payload.into()).await?;

    Ok(Json(user))
}

/// Deletes a user by username.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let target = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    permissions::require(&actor, Action::Delete, &Resource::Account { owner_id: target.id })?;

    if actor.id() == Some(target.id) {
        return Err(AppError::Validation("Cannot delete yourself".to_string()));
    }

    if !state.users.delete(&target.id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

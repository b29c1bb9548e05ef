// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{NewUser, SignupRequest, TokenRequest, UserRole, is_reserved_username},
    repo::Repository,
    state::AppState,
    utils::{code::generate_confirmation_code, jwt::sign_jwt},
};

/// Issues (or re-issues) a confirmation code for the given identity.
///
/// Signing up again with the same username+email pair is idempotent and
/// regenerates the code; claiming a username or email held by a different
/// identity fails. The code is dispatched through the notifier, whose
/// failure does not roll back the user record.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    if is_reserved_username(&payload.username) {
        return Err(AppError::ReservedUsername);
    }

    let by_username = state.users.find_by_username(&payload.username).await?;
    let by_email = state.users.find_by_email(&payload.email).await?;

    let code = generate_confirmation_code();

    let user = match (by_username, by_email) {
        // Same identity signing up again: regenerate the code, no conflict.
        (Some(existing), Some(by_email)) if existing.id == by_email.id => {
            state.users.set_confirmation_code(existing.id, &code).await?;
            existing
        }
        (None, None) => {
            // The insert still races against concurrent signups; the unique
            // constraints turn the loser into DuplicateIdentity.
            state
                .users
                .create(NewUser {
                    username: payload.username.clone(),
                    email: payload.email.clone(),
                    first_name: None,
                    last_name: None,
                    bio: None,
                    role: UserRole::User,
                    is_superuser: false,
                    confirmation_code: code.clone(),
                })
                .await?
        }
        _ => {
            return Err(AppError::DuplicateIdentity(
                "Username or email is already registered to another identity".to_string(),
            ));
        }
    };

    if let Err(e) = state
        .notifier
        .send_confirmation_code(&user.username, &user.email, &code)
        .await
    {
        // The user stays pending and can retry signup for a fresh code.
        tracing::warn!(
            "Failed to dispatch confirmation code for '{}': {}",
            user.username,
            e
        );
    }

    Ok(Json(json!({
        "username": user.username,
        "email": user.email,
    })))
}

/// Exchanges a confirmation code for a signed access token.
pub async fn token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Exact, case-sensitive comparison. Codes are not rotated on use: a
    // valid code keeps working until signup issues a new one.
    match &user.confirmation_code {
        Some(code) if *code == payload.confirmation_code => {}
        _ => return Err(AppError::InvalidCode),
    }

    // Idempotent: repeated exchanges keep the account active.
    state.users.mark_confirmed(user.id).await?;

    let token = sign_jwt(
        user.id,
        user.role,
        user.is_superuser,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "id": user.id,
        "token": token,
        "type": "Bearer",
    })))
}

// src/repo/users.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::user::{NewUser, User, UserListParams, UserPatch};
use crate::repo::{Repository, is_unique_violation};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, \
                            is_superuser, confirmation_code, confirmed, created_at";

/// Identity store backed by the 'users' table. Username and email
/// uniqueness is guaranteed by the schema; this repository only translates
/// the violations into domain errors.
#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Replaces the stored confirmation code (signup re-issue).
    pub async fn set_confirmation_code(&self, id: i64, code: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET confirmation_code = $1 WHERE id = $2")
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Transitions the account to its active state. Idempotent: repeat
    /// token exchanges with a still-valid code are fine.
    pub async fn mark_confirmed(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET confirmed = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository for UserRepo {
    type Entity = User;
    type Key = i64;
    type Create = NewUser;
    type Patch = UserPatch;
    type Filter = UserListParams;

    async fn create(&self, data: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
             (username, email, first_name, last_name, bio, role, is_superuser, confirmation_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.bio)
        .bind(data.role)
        .bind(data.is_superuser)
        .bind(&data.confirmation_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateIdentity(
                    "Username or email is already registered".to_string(),
                )
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(user)
    }

    async fn get(&self, key: &i64) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    async fn update(&self, key: &i64, patch: UserPatch) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        // Perform updates sequentially if fields are present
        if let Some(username) = patch.username {
            sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
                .bind(username)
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(map_identity_conflict)?;
        }

        if let Some(email) = patch.email {
            sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
                .bind(email)
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(map_identity_conflict)?;
        }

        if let Some(role) = patch.role {
            sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
                .bind(role)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(first_name) = patch.first_name {
            sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
                .bind(first_name)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(last_name) = patch.last_name {
            sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
                .bind(last_name)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(bio) = patch.bio {
            sqlx::query("UPDATE users SET bio = $1 WHERE id = $2")
                .bind(bio)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("User not found".to_string()))?;

        tx.commit().await?;

        Ok(user)
    }

    async fn delete(&self, key: &i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete user: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &UserListParams) -> Result<Vec<User>, AppError> {
        let search_pattern = filter.q.as_ref().map(|k| format!("%{}%", k));

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::TEXT IS NULL OR username ILIKE $1) \
             ORDER BY username"
        ))
        .bind(search_pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

fn map_identity_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::DuplicateIdentity("Username or email is already registered".to_string())
    } else {
        AppError::from(e)
    }
}

// src/repo/mod.rs

use async_trait::async_trait;

use crate::error::AppError;

pub mod catalog;
pub mod reviews;
pub mod users;

pub use catalog::{CategoryRepo, GenreRepo, TitleRepo};
pub use reviews::{CommentRepo, ReviewRepo};
pub use users::UserRepo;

/// Uniform persistence contract, implemented once per entity and handed to
/// handlers through `AppState`. Keys are the entity's external lookup
/// (numeric id, slug, or a scoping tuple for nested resources).
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity;
    type Key: Send + Sync;
    type Create: Send;
    type Patch: Send;
    type Filter: Send + Sync;

    async fn create(&self, data: Self::Create) -> Result<Self::Entity, AppError>;
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Entity>, AppError>;
    async fn update(&self, key: &Self::Key, patch: Self::Patch) -> Result<Self::Entity, AppError>;
    /// Returns false when nothing matched the key.
    async fn delete(&self, key: &Self::Key) -> Result<bool, AppError>;
    async fn list(&self, filter: &Self::Filter) -> Result<Vec<Self::Entity>, AppError>;
}

// Postgres error code for unique violation is 23505, 23503 for FK violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("unique constraint") || msg.contains("23505")
}

pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("foreign key constraint") || msg.contains("23503")
}

// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::repo::{CategoryRepo, CommentRepo, GenreRepo, ReviewRepo, TitleRepo, UserRepo};
use crate::utils::notify::Notifier;

/// Shared application state: configuration, per-entity repositories and the
/// notification seam, injected into handlers instead of being reached for
/// globally.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,

    pub users: UserRepo,
    pub categories: CategoryRepo,
    pub genres: GenreRepo,
    pub titles: TitleRepo,
    pub reviews: ReviewRepo,
    pub comments: CommentRepo,

    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            users: UserRepo::new(pool.clone()),
            categories: CategoryRepo::new(pool.clone()),
            genres: GenreRepo::new(pool.clone()),
            titles: TitleRepo::new(pool.clone()),
            reviews: ReviewRepo::new(pool.clone()),
            comments: CommentRepo::new(pool.clone()),
            pool,
            config,
            notifier,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
